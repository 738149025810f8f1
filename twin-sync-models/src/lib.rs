pub mod constants;
pub mod event;
pub mod retry;
pub mod settings;
pub mod twin;

pub use event::DeviceEvent;
pub use retry::{build_exponential_backoff, RetryPolicy};
pub use settings::Settings;
pub use twin::{DeviceCredential, TwinSnapshot};
