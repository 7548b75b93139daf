/// CredentialProvider port supplying the `Authorization` header value
///
/// The network layer treats the value as opaque and attaches it to every
/// request of the source it was configured for.
pub trait CredentialProvider: Send + Sync {
    fn authorization_header(&self) -> String;
}
