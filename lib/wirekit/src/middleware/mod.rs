//! Tower layers making up the filter pipeline.
//!
//! Each stage is a regular [`Layer`] over services speaking
//! [`Request`](crate::Request) / [`Response`](crate::Response), so they can
//! also be stacked by hand with [`ServiceBuilder`]. The pipeline builder
//! assembles them in a fixed order, outermost first:
//!
//! | Stage | Layer | Enabled |
//! |-------|-------|---------|
//! | charset | [`CharsetLayer`] | always |
//! | cookies | [`CookieLayer`] | `cookie_support` |
//! | logging | [`LoggingLayer`] | `logging` |
//! | decode | [`DecodeLayer`] | `content_decoding` |
//!
//! # Example
//!
//! ```ignore
//! use wirekit::middleware::{CharsetLayer, DecodeLayer, ServiceBuilder};
//!
//! let service = ServiceBuilder::new()
//!     .layer(CharsetLayer::new())
//!     .layer(DecodeLayer::new())
//!     .service(app);
//! ```

mod charset;
mod cookies;
mod decode;
mod logging;

pub use charset::{Charset, CharsetLayer, DEFAULT_CHARSET, set_charset};
pub use cookies::{Cookie, CookieJar, CookieLayer, Cookies};
pub use decode::{ACCEPT_ENCODING, Decode, DecodeLayer, decode_body};
pub use logging::{LogLevel, Logging, LoggingLayer, MAX_LOGGED_BODY};
pub use tower::{Layer, ServiceBuilder};
