use tokio::sync::mpsc;
use voicebench_core::{Notification, Variant};
use voicebench_logging::{vb_info, vb_warn};

/// Transient place where notifications are shown.
///
/// Delivery is fire-and-forget: a surface that cannot show a notification
/// drops it.
pub trait NotificationSurface: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSurface;

impl NotificationSurface for LogSurface {
    fn notify(&self, notification: &Notification) {
        match notification.variant {
            Variant::Error => vb_warn!("{}: {}", notification.title, notification.message),
            Variant::Success | Variant::Info => {
                vb_info!("{}: {}", notification.title, notification.message)
            }
        }
    }
}

/// Forwards notifications to whoever renders them.
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSurface {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSurface for ChannelSurface {
    fn notify(&self, notification: &Notification) {
        let _ = self.tx.send(notification.clone());
    }
}
