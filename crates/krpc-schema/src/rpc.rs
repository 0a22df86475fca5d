/// A batch of procedure calls sent on the call channel.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(message, repeated, tag = "1")]
    pub calls: ::prost::alloc::vec::Vec<ProcedureCall>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcedureCall {
    #[prost(string, tag = "1")]
    pub service: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub procedure: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub arguments: ::prost::alloc::vec::Vec<Argument>,
    #[prost(uint32, tag = "4")]
    pub service_id: u32,
    #[prost(uint32, tag = "5")]
    pub procedure_id: u32,
}

/// One encoded argument and its position in the procedure signature.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Argument {
    #[prost(uint32, tag = "1")]
    pub position: u32,
    #[prost(bytes = "bytes", tag = "2")]
    pub value: ::bytes::Bytes,
}

/// Reply to a [`Request`]: a request-level error or one result per call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<Error>,
    #[prost(message, repeated, tag = "2")]
    pub results: ::prost::alloc::vec::Vec<ProcedureResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcedureResult {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<Error>,
    #[prost(bytes = "bytes", tag = "2")]
    pub value: ::bytes::Bytes,
}

/// Server-side failure. `service` and `name` identify a typed exception;
/// both are empty for untyped errors.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Error {
    #[prost(string, tag = "1")]
    pub service: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub description: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub stack_trace: ::prost::alloc::string::String,
}

impl ProcedureResult {
    /// A successful result carrying `value`.
    pub fn ok(value: impl Into<::bytes::Bytes>) -> Self {
        Self {
            error: None,
            value: value.into(),
        }
    }

    /// A failed result.
    pub fn err(error: Error) -> Self {
        Self {
            error: Some(error),
            value: ::bytes::Bytes::new(),
        }
    }
}

impl Error {
    /// An error attributed to a typed exception of `service`.
    pub fn typed(
        service: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            description: description.into(),
            stack_trace: String::new(),
        }
    }

    /// An untyped error carrying only a description.
    pub fn untyped(description: impl Into<String>) -> Self {
        Self::typed("", "", description)
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn request_preserves_call_order() {
        let req = Request {
            calls: ["A", "B", "C"]
                .iter()
                .map(|p| ProcedureCall {
                    service: "Svc".into(),
                    procedure: (*p).into(),
                    ..ProcedureCall::default()
                })
                .collect(),
        };

        let decoded = Request::decode(req.encode_to_vec().as_slice()).unwrap();
        let names: Vec<_> = decoded.calls.iter().map(|c| c.procedure.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn empty_error_is_absent_on_the_wire() {
        let result = ProcedureResult::ok(vec![0x14]);
        let decoded = ProcedureResult::decode(result.encode_to_vec().as_slice()).unwrap();
        assert!(decoded.error.is_none());
        assert_eq!(decoded.value.as_ref(), &[0x14]);
    }
}
