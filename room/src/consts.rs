pub const PORT_FROM: u16 = 9000;
pub const PORT_TO: u16 = 9020;

pub const HB_DURATION: tokio::time::Duration = tokio::time::Duration::from_secs(10);

/// Capacity of the room's request channel; connection pumps and timers block
/// here rather than dropping events.
pub const REQ_CHANNEL_SIZE: usize = 32;
pub const CONN_CHANNEL_SIZE: usize = 128;

pub const DEFAULT_EMOJI: &str = "\u{1F600}";

/// Per-player hue palette, light and dark shades. Assigned round-robin in
/// join order.
pub const PLAYER_COLORS: [[&str; 2]; 8] = [
    ["#FF6B6B", "#C92A2A"], // red
    ["#4DABF7", "#1864AB"], // blue
    ["#51CF66", "#046113"], // green
    ["#FFD43B", "#F08C00"], // yellow
    ["#FF9F40", "#E67700"], // orange
    ["#FF6BFF", "#C92AC9"], // magenta
    ["#FFA07A", "#FF4F00"], // salmon
    ["#66D9E8", "#0B7285"], // cyan
];
