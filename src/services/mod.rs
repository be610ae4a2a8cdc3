// Service exports
pub mod alerts;
pub mod completion;

pub use alerts::{AlertDispatcher, AlertTrace, DispatchFailure, DispatchReport, DispatchState, RetryPolicy};
pub use completion::{CompletionClient, CompletionError, CompletionProvider, FALLBACK_REPLY};
