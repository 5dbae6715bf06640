use dotenvy::dotenv;
use flowbridge_core::config::RelaySettings;
use flowbridge_transport_telegram::config::{BotSettings, TelegramSettings};
use flowbridge_transport_telegram::runner::run_bot;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Secret-masking rules, applied in order to every log line
struct RedactionPatterns {
    rules: Vec<(Regex, &'static str)>,
}

impl RedactionPatterns {
    /// Compile the masking rules
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        let table: [(&str, &'static str); 5] = [
            // Bot API URLs carry the token in the path
            (
                r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)",
                "$1[TELEGRAM_TOKEN]$3",
            ),
            (r"([0-9]{8,10}:[A-Za-z0-9_-]{35})", "[TELEGRAM_TOKEN]"),
            (r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+", "$1[TELEGRAM_TOKEN]"),
            (r"VOICEFLOW_API_KEY=[^\s&]+", "VOICEFLOW_API_KEY=[MASKED]"),
            (r"VF\.DM\.[A-Za-z0-9._-]+", "[VOICEFLOW_KEY]"),
        ];

        let rules = table
            .into_iter()
            .map(|(pattern, replacement)| Ok((Regex::new(pattern)?, replacement)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    fn redact(&self, input: &str) -> String {
        self.rules
            .iter()
            .fold(input.to_string(), |line, (pattern, replacement)| {
                pattern.replace_all(&line, *replacement).into_owned()
            })
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // The caller's buffer was consumed in full even if the redacted length differs
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Compiled before logging so nothing is written unredacted
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting Flowbridge TG Bot...");

    let settings = init_settings();

    run_bot(settings).await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "flowbridge_core=info,flowbridge_runtime=info,flowbridge_transport_telegram=info,flowbridge_telegram_bot=info,hyper=warn,h2=error,reqwest=warn,tokio=warn,tower=warn",
            )
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<BotSettings> {
    let relay_settings = match RelaySettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load relay configuration: {}", e);
            std::process::exit(1);
        }
    };
    let telegram_settings = match TelegramSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load telegram configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    Arc::new(BotSettings::new(relay_settings, telegram_settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_telegram_token_in_url() {
        let patterns = RedactionPatterns::new().expect("patterns compile");
        let line = "POST https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw/sendMessage";

        let redacted = patterns.redact(line);

        assert!(!redacted.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));
    }

    #[test]
    fn test_redacts_voiceflow_key() {
        let patterns = RedactionPatterns::new().expect("patterns compile");

        let redacted = patterns.redact("authorization: VF.DM.65f1c0a2.Xy9zQ_w-1 sent");
        assert_eq!(redacted, "authorization: [VOICEFLOW_KEY] sent");

        let redacted = patterns.redact("VOICEFLOW_API_KEY=secret&x=1");
        assert_eq!(redacted, "VOICEFLOW_API_KEY=[MASKED]&x=1");
    }

    #[test]
    fn test_writer_reports_original_length() {
        let patterns = Arc::new(RedactionPatterns::new().expect("patterns compile"));
        let mut writer = RedactingWriter::new(Vec::new(), patterns);
        let line = b"key VF.DM.abc.def\n";

        let written = writer.write(line).expect("write succeeds");

        assert_eq!(written, line.len());
        assert_eq!(String::from_utf8_lossy(&writer.inner), "key [VOICEFLOW_KEY]\n");
    }
}
