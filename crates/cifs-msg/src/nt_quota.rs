//! The NT_TRANSACT_QUERY_QUOTA sub-command, carried by
//! SMB_COM_NT_TRANSACT.

use binrw::prelude::*;
use cifs_dtyp::boolean::Boolean;
use cifs_fscc::quota::QuotaList;

use crate::error::{CodecError, Result};
use crate::header::Direction;
use crate::registry::NtTransCodec;
use crate::transact::NtTransPayload;

pub const NT_TRANSACT_QUERY_QUOTA: u16 = 0x0007;

/// A quota query. The 16-byte parameter region selects the file and the
/// enumeration mode; the data region optionally restricts the query to
/// a SID list or a starting SID.
#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct QueryQuotaParameters {
    pub fid: u16,
    pub return_single_entry: Boolean,
    pub restart_scan: Boolean,
    pub sid_list_length: u32,
    pub start_sid_length: u32,
    pub start_sid_offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NtTransQueryQuotaRequest {
    pub parameters: QueryQuotaParameters,
    pub sid_list: Vec<u8>,
}

impl NtTransCodec for NtTransQueryQuotaRequest {
    const FUNCTION: u16 = NT_TRANSACT_QUERY_QUOTA;
    const DIRECTION: Direction = Direction::Request;

    fn from_payload(payload: &NtTransPayload) -> Result<Self> {
        if !payload.setup.is_empty() {
            return Err(CodecError::format(
                "SetupCount",
                "a quota query carries no setup words",
            ));
        }
        let mut cursor = std::io::Cursor::new(payload.parameters.as_slice());
        let parameters = QueryQuotaParameters::read_le(&mut cursor)?;
        if cursor.position() as usize != payload.parameters.len() {
            return Err(CodecError::format(
                "NT_Trans_Parameters",
                "a quota query carries exactly 16 parameter bytes",
            ));
        }
        Ok(Self {
            parameters,
            sid_list: payload.data.clone(),
        })
    }

    fn to_payload(&self) -> Result<NtTransPayload> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.parameters.write_le(&mut cursor)?;
        Ok(NtTransPayload {
            function: Self::FUNCTION,
            setup: Vec::new(),
            parameters: cursor.into_inner(),
            data: self.sid_list.clone(),
        })
    }
}

/// The quota entries returned by the server. The 4-byte parameter
/// region restates the data region's length and is derived on encode,
/// validated on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NtTransQueryQuotaResponse {
    pub quota: QuotaList,
}

impl NtTransCodec for NtTransQueryQuotaResponse {
    const FUNCTION: u16 = NT_TRANSACT_QUERY_QUOTA;
    const DIRECTION: Direction = Direction::Response;

    fn from_payload(payload: &NtTransPayload) -> Result<Self> {
        let length_bytes: [u8; 4] = payload.parameters.as_slice().try_into().map_err(|_| {
            CodecError::format(
                "NT_Trans_Parameters",
                "a quota response carries exactly 4 parameter bytes",
            )
        })?;
        let declared = u32::from_le_bytes(length_bytes) as usize;
        if declared != payload.data.len() {
            return Err(CodecError::format(
                "QuotaDataLength",
                format!(
                    "declared {declared} bytes, data region holds {}",
                    payload.data.len()
                ),
            ));
        }
        let mut cursor = std::io::Cursor::new(payload.data.as_slice());
        Ok(Self {
            quota: QuotaList::read_le(&mut cursor)?,
        })
    }

    fn to_payload(&self) -> Result<NtTransPayload> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.quota.write_le(&mut cursor)?;
        let data = cursor.into_inner();
        Ok(NtTransPayload {
            function: Self::FUNCTION,
            setup: Vec::new(),
            parameters: (data.len() as u32).to_le_bytes().to_vec(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cifs_dtyp::file_time::FileTime;
    use cifs_fscc::quota::FileQuotaInformation;
    use cifs_tests::*;

    test_binrw! {
        QueryQuotaParameters: QueryQuotaParameters {
            fid: 0x4001,
            return_single_entry: Boolean::from(true),
            restart_scan: Boolean::from(true),
            sid_list_length: 0,
            start_sid_length: 0,
            start_sid_offset: 0,
        } => "01400101 00000000 00000000 00000000"
    }

    #[test]
    fn test_request_payload_round_trip() {
        let request = NtTransQueryQuotaRequest {
            parameters: QueryQuotaParameters {
                fid: 7,
                restart_scan: Boolean::from(true),
                ..Default::default()
            },
            sid_list: vec![],
        };
        let payload = request.to_payload().unwrap();
        assert_eq!(payload.function, NT_TRANSACT_QUERY_QUOTA);
        assert_eq!(payload.parameters.len(), 16);
        assert_eq!(
            NtTransQueryQuotaRequest::from_payload(&payload).unwrap(),
            request
        );
    }

    #[test]
    fn test_request_rejects_truncated_parameters() {
        let mut payload = NtTransQueryQuotaRequest::default().to_payload().unwrap();
        payload.parameters.truncate(12);
        assert!(NtTransQueryQuotaRequest::from_payload(&payload).is_err());
    }

    #[test]
    fn test_response_payload_round_trip() {
        // S-1-5-32-544, the builtin administrators group.
        let sid = vec![
            0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x20, 0x00, 0x00, 0x00, 0x20, 0x02,
            0x00, 0x00,
        ];
        let response = NtTransQueryQuotaResponse {
            quota: QuotaList::from(vec![FileQuotaInformation::new(
                FileTime::ZERO,
                0x2000,
                0x8000,
                0x10000,
                sid,
            )]),
        };
        let payload = response.to_payload().unwrap();
        assert_eq!(payload.parameters, 56u32.to_le_bytes().to_vec());
        assert_eq!(payload.data.len(), 56);
        assert_eq!(
            NtTransQueryQuotaResponse::from_payload(&payload).unwrap(),
            response
        );
    }

    #[test]
    fn test_response_rejects_length_mismatch() {
        let mut payload = NtTransQueryQuotaResponse::default().to_payload().unwrap();
        payload.parameters = 4u32.to_le_bytes().to_vec();
        assert!(matches!(
            NtTransQueryQuotaResponse::from_payload(&payload),
            Err(CodecError::Format {
                field: "QuotaDataLength",
                ..
            })
        ));
    }
}
