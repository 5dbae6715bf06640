/// Command and update handlers
pub mod handlers;
/// Telegram implementation of the chat transport seam
pub mod transport;

pub use transport::TelegramChatTransport;

use flowbridge_core::VoiceflowClient;
use flowbridge_runtime::InteractionDispatcher;

/// Dispatcher wired to Telegram and the Voiceflow runtime
pub type TelegramDispatcher = InteractionDispatcher<TelegramChatTransport, VoiceflowClient>;
