//! Voicebench engine: REST access, session context and the async driver
//! that runs list views.
mod api;
mod auth;
mod clock;
mod runtime;
mod surface;
mod types;

pub use api::{ApiSettings, HttpResourceApi, ResourceApi};
pub use auth::{AuthState, DashboardContext, Session, SessionProvider, StaticSessionProvider};
pub use clock::{Clock, TokioClock};
pub use runtime::{ListViewRuntime, ViewCommand, ViewHandle};
pub use surface::{ChannelSurface, LogSurface, NotificationSurface};
pub use types::{ApiError, FailureKind};
