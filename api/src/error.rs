use serde::{Deserialize, Serialize};

// the json error envelope defined by the protocol, returned with a 4xx/5xx
// status before any data bytes have been flushed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub htsget: ErrorBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorEnvelope {
            htsget: ErrorBody {
                error: error.into(),
                message: message.into(),
            },
        }
    }
}
