pub const TOPIC_WATCH_APPMESSAGE: &str = "traveler/watch/appmessage";
pub const TOPIC_WATCH_KEYS: &str = "traveler/watch/keys";

pub const TOPIC_COMPANION_STATUS: &str = "traveler/companion/status";
