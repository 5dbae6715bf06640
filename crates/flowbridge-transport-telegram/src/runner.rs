use crate::bot::handlers::{self, Command};
use crate::bot::{TelegramChatTransport, TelegramDispatcher};
use crate::config::BotSettings;
use flowbridge_core::VoiceflowClient;
use flowbridge_runtime::CallbackRegistry;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info};

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let bot = Bot::new(settings.telegram.telegram_token.clone());

    let backend = Arc::new(VoiceflowClient::new(settings.relay.as_ref()));
    info!(
        base_url = %settings.relay.voiceflow_base_url,
        version = settings.relay.voiceflow_version_id.as_deref().unwrap_or("default"),
        "Voiceflow client initialized."
    );

    let registry = init_callback_registry(&settings);
    let transport = Arc::new(TelegramChatTransport::new(bot.clone()));
    let dispatcher: Arc<TelegramDispatcher> =
        Arc::new(TelegramDispatcher::new(transport, backend, registry));
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn init_callback_registry(settings: &BotSettings) -> Arc<CallbackRegistry> {
    let capacity = settings.relay.callback_capacity;
    let ttl = settings.relay.callback_ttl();

    info!(
        "Initializing CallbackRegistry (capacity: {}, ttl: {}s)",
        capacity,
        ttl.as_secs()
    );

    Arc::new(CallbackRegistry::new(capacity, ttl))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    dispatcher: Arc<TelegramDispatcher>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(msg, dispatcher).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    msg: Message,
    dispatcher: Arc<TelegramDispatcher>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(msg, dispatcher).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dispatcher: Arc<TelegramDispatcher>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_callback(bot, q, dispatcher).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}

