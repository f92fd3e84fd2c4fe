//! Request construction, signing, and dispatch.
mod builder;
mod credentials;
mod decorators;
mod exchange;
mod request;
mod signer;

#[cfg(test)]
mod tests;

pub use builder::{RequestBuilder, RequestConfiguration, RequestHandle};
pub use credentials::{ClientIdentity, CredentialResolver};
pub use decorators::{
    ACCEPT_COMPRESSED, ACCEPT_JSON, ACCEPT_MEDIA, CLIENT_ACCESS_TOKEN, IdentityHeaders,
    MULTIPART_FORM_DATA, Preview, REQUESTING_FOR, RequestDecorator, TOOL_USER_AGENT,
};
pub use exchange::Exchange;
pub use request::PendingRequest;
pub use signer::{SignedQuery, UrlSigner};
