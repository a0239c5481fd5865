use crate::protocol::ClientSdkInfo;

/// The user agent the SDK sends with outgoing requests.
pub const USER_AGENT: &str = concat!("faultline-rust/", env!("CARGO_PKG_VERSION"));

lazy_static::lazy_static! {
    pub(crate) static ref SDK_INFO: ClientSdkInfo = ClientSdkInfo {
        name: "faultline.rust".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        integrations: Vec::new(),
    };
}
