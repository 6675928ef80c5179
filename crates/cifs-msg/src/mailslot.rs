//! The TRANS_MAILSLOT_WRITE sub-command: an unacknowledged datagram
//! written into a mailslot, carried by SMB_COM_TRANSACTION.

use binrw::NullString;

use crate::error::{CodecError, Result};
use crate::header::Direction;
use crate::registry::TransCodec;
use crate::transact::TransPayload;
use crate::transaction::TransactionRequest;

pub const TRANS_MAILSLOT_WRITE: u16 = 0x0001;

/// A mailslot write. Setup carries the sub-command id, priority and
/// class; the message rides in the data section, the parameter section
/// stays empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransMailslotWriteRequest {
    /// Mailslot path, e.g. `\MAILSLOT\messenger`.
    pub name: NullString,
    pub priority: u16,
    pub class: u16,
    pub message: Vec<u8>,
}

impl TransMailslotWriteRequest {
    /// Lowers into a primary transaction carrier ready for framing.
    pub fn to_transaction(&self) -> Result<TransactionRequest> {
        let payload = self.to_payload()?;
        TransactionRequest::new(payload.name, payload.setup, payload.parameters, payload.data)
    }
}

impl TransCodec for TransMailslotWriteRequest {
    const SUB_COMMAND: u16 = TRANS_MAILSLOT_WRITE;
    const DIRECTION: Direction = Direction::Request;

    fn from_payload(payload: &TransPayload) -> Result<Self> {
        let setup: [u16; 3] = payload.setup.as_slice().try_into().map_err(|_| {
            CodecError::format("SetupCount", "a mailslot write carries three setup words")
        })?;
        if setup[0] != Self::SUB_COMMAND {
            return Err(CodecError::format(
                "Setup",
                "setup[0] does not name TRANS_MAILSLOT_WRITE",
            ));
        }
        if !payload.parameters.is_empty() {
            return Err(CodecError::format(
                "TotalParameterCount",
                "a mailslot write carries no parameter bytes",
            ));
        }
        Ok(Self {
            name: payload.name.clone(),
            priority: setup[1],
            class: setup[2],
            message: payload.data.clone(),
        })
    }

    fn to_payload(&self) -> Result<TransPayload> {
        Ok(TransPayload {
            setup: vec![Self::SUB_COMMAND, self.priority, self.class],
            name: self.name.clone(),
            parameters: Vec::new(),
            data: self.message.clone(),
        })
    }
}

/// The acknowledgement: every section empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransMailslotWriteResponse;

impl TransCodec for TransMailslotWriteResponse {
    const SUB_COMMAND: u16 = TRANS_MAILSLOT_WRITE;
    const DIRECTION: Direction = Direction::Response;

    fn from_payload(payload: &TransPayload) -> Result<Self> {
        if !payload.setup.is_empty() || !payload.parameters.is_empty() || !payload.data.is_empty() {
            return Err(CodecError::format(
                "SetupCount",
                "a mailslot write acknowledgement carries no payload",
            ));
        }
        Ok(Self)
    }

    fn to_payload(&self) -> Result<TransPayload> {
        Ok(TransPayload::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransMailslotWriteRequest {
        TransMailslotWriteRequest {
            name: NullString::from("\\MAILSLOT\\messenger"),
            priority: 1,
            class: 2,
            message: b"workstation online".to_vec(),
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let request = sample();
        let payload = request.to_payload().unwrap();
        assert_eq!(payload.sub_command(), Some(TRANS_MAILSLOT_WRITE));
        assert_eq!(payload.setup, vec![0x0001, 1, 2]);
        assert!(payload.parameters.is_empty());
        assert_eq!(
            TransMailslotWriteRequest::from_payload(&payload).unwrap(),
            request
        );
    }

    #[test]
    fn test_rejects_parameter_bytes() {
        let mut payload = sample().to_payload().unwrap();
        payload.parameters = vec![0xff];
        assert!(matches!(
            TransMailslotWriteRequest::from_payload(&payload),
            Err(CodecError::Format {
                field: "TotalParameterCount",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_short_setup() {
        let mut payload = sample().to_payload().unwrap();
        payload.setup.pop();
        assert!(TransMailslotWriteRequest::from_payload(&payload).is_err());
    }

    #[test]
    fn test_to_transaction_totals() {
        let transaction = sample().to_transaction().unwrap();
        assert_eq!(transaction.total_parameter_count, 0);
        assert_eq!(transaction.total_data_count, 18);
        assert_eq!(transaction.setup.len(), 3);
    }

    #[test]
    fn test_empty_ack() {
        let payload = TransMailslotWriteResponse.to_payload().unwrap();
        assert_eq!(
            TransMailslotWriteResponse::from_payload(&payload).unwrap(),
            TransMailslotWriteResponse
        );
        let mut stray = payload;
        stray.data = vec![0];
        assert!(TransMailslotWriteResponse::from_payload(&stray).is_err());
    }
}
