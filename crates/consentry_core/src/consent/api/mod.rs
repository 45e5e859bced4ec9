pub mod p2c;
pub mod types;
pub mod u2c;

pub use types::{
    C2pRequest, C2pResponse, ExchangeRequest, ExchangeResponse, LifecycleRequest,
    LifecycleResponse, NoticeRequest, NoticeResponse, P2cRequest, P2cResponse, TokenRequest,
    TokenResponse, U2cRequest, U2cResponse,
};
