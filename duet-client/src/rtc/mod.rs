mod remote_media;
mod rtc_negotiation;

pub use remote_media::*;
pub use rtc_negotiation::*;
