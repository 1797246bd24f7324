//! Cookie codec for the waiting room gateway's signed, encrypted identity
//! cookie (spec: authenticate-then-encrypt, in the tradition of
//! `gorilla/securecookie`).

mod cookie;

pub use cookie::{CookieCodec, InvalidCookie};
