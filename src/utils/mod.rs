pub mod autodelete;
pub mod deeplink;
pub mod http;
pub mod logging;
pub mod normalize;
