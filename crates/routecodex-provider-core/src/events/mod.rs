mod hub;
mod terminal_sink;
mod types;

pub use hub::{EventHub, EventSink};
pub use terminal_sink::TerminalEventSink;
pub use types::{
    DownstreamEvent, Event, OperationalEvent, SeriesCooldownEndEvent, SeriesCooldownStartEvent,
    UnavailableEndEvent, UnavailableStartEvent, UpstreamEvent,
};
