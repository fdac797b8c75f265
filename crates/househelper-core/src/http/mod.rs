mod client;
mod transport;

pub use client::{ApiClient, RequestDescriptor};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TransportError,
};
