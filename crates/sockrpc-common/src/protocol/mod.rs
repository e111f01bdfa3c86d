pub mod error;
pub mod methods;
pub mod requests;
pub mod responses;
pub mod types;


pub use error::{FaultKind, Result, RpcFault, SockrpcError};
pub use methods::MethodSignature;
pub use requests::{MethodName, Request, RequestId, RpcParams};
pub use responses::{Response, RpcResult};
pub use types::{ParamType, TypeTag};
