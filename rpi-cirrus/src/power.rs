//! Power domain and routing graph events.

/// Power state of a codec power domain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BiasLevel {
    Off,
    Standby,
    Prepare,
    On,
}

/// Power event of a routing graph node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    PrePowerUp,
    PostPowerUp,
    PrePowerDown,
    PostPowerDown,
}

/// Name of the virtual routing node which is powered while SPDIF capture is routed.
pub const SPDIF_RX_WIDGET: &str = "dummy SPDIFRX";
