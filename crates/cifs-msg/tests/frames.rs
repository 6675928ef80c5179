//! End-to-end frame tests: chains, byte-exact images, and fragmented
//! transaction exchanges.

use binrw::NullString;
use cifs_msg::close::{CloseRequest, CloseResponse};
use cifs_msg::mailslot::{TRANS_MAILSLOT_WRITE, TransMailslotWriteRequest};
use cifs_msg::nt_quota::{NT_TRANSACT_QUERY_QUOTA, NtTransQueryQuotaRequest, QueryQuotaParameters};
use cifs_msg::nt_transact::NtTransactRequest;
use cifs_msg::read_andx::{ReadAndxRequest, ReadAndxResponse};
use cifs_msg::transaction::{TransactionRequest, TransactionSecondaryRequest};
use cifs_msg::write_andx::WriteAndxRequest;
use cifs_msg::{
    CodecError, CommandBody, Direction, NtTransactReassembly, Registry, SmbCommand, SmbFrame,
    SmbHeader, TransactionReassembly,
};
use cifs_tests::hex_to_u8_array;
use const_format::concatcp;

const CLOSE_HEADER: &str = "ff534d4204000000001841400000000000000000000000000000000000000000";
const CLOSE_BODY: &str = "030140ffffffff0000";

#[test]
fn test_close_request_frame_image() {
    let frame = SmbFrame::new(
        SmbHeader::default(),
        CloseRequest {
            fid: 0x4001,
            ..Default::default()
        },
    );
    assert_eq!(
        frame.encode().unwrap(),
        hex_to_u8_array!(concatcp!(CLOSE_HEADER, CLOSE_BODY))
    );
    assert_eq!(SmbFrame::decode(&frame.encode().unwrap()).unwrap(), frame);
}

#[test]
fn test_read_response_derived_fields() {
    let frame = SmbFrame::new(
        SmbHeader::new(SmbCommand::ReadAndx).into_response(),
        ReadAndxResponse {
            available: 0,
            pad: vec![0, 0],
            data: (1..=10).collect(),
        },
    );
    let bytes = frame.encode().unwrap();

    // Header (32) + word count (1) + 12 words + byte count (2) + 12
    // data bytes.
    assert_eq!(bytes.len(), 71);
    assert_eq!(bytes[32], 12);
    // The AndX link holds the sentinel.
    assert_eq!(bytes[33], 0xff);
    // DataLength = 10, DataOffset = 61, ByteCount = 12.
    assert_eq!(bytes[43..45], [10, 0]);
    assert_eq!(bytes[45..47], [61, 0]);
    assert_eq!(bytes[57..59], [12, 0]);
    assert_eq!(&bytes[61..], &(1..=10).collect::<Vec<u8>>()[..]);

    assert_eq!(SmbFrame::decode(&bytes).unwrap(), frame);
}

#[test]
fn test_three_command_chain_round_trip() {
    let frame = SmbFrame::new(
        SmbHeader::new(SmbCommand::WriteAndx),
        WriteAndxRequest {
            fid: 0x4001,
            offset: 0x2000,
            data: vec![0xaa; 24],
            ..Default::default()
        },
    )
    .chain(ReadAndxRequest {
        fid: 0x4001,
        max_count: 512,
        ..Default::default()
    })
    .chain(CloseRequest {
        fid: 0x4001,
        ..Default::default()
    });

    let bytes = frame.encode().unwrap();
    assert_eq!(bytes[4], SmbCommand::WriteAndx as u8);

    let decoded = SmbFrame::decode(&bytes).unwrap();
    assert_eq!(decoded.commands.len(), 3);
    assert_eq!(decoded, frame);
}

#[test]
fn test_backward_link_is_chain_integrity_error() {
    let frame = SmbFrame::new(
        SmbHeader::new(SmbCommand::ReadAndx),
        ReadAndxRequest::default(),
    )
    .chain(CloseRequest::default());
    let mut bytes = frame.encode().unwrap();

    // The link offset words sit right after the first command's word
    // count and link command byte.
    bytes[35] = 32;
    bytes[36] = 0;
    assert!(matches!(
        SmbFrame::decode(&bytes),
        Err(CodecError::ChainIntegrity(_))
    ));
}

#[test]
fn test_link_outside_frame_is_chain_integrity_error() {
    let frame = SmbFrame::new(
        SmbHeader::new(SmbCommand::ReadAndx),
        ReadAndxRequest::default(),
    )
    .chain(CloseRequest::default());
    let mut bytes = frame.encode().unwrap();

    bytes[35] = 0xff;
    bytes[36] = 0xff;
    assert!(matches!(
        SmbFrame::decode(&bytes),
        Err(CodecError::ChainIntegrity(_))
    ));
}

#[test]
fn test_non_chaining_command_cannot_link() {
    let frame = SmbFrame::new(SmbHeader::default(), CloseRequest::default())
        .chain(ReadAndxRequest::default());
    assert!(matches!(
        frame.encode(),
        Err(CodecError::ChainIntegrity(_))
    ));
}

#[test]
fn test_empty_frame_cannot_encode() {
    let frame = SmbFrame {
        header: SmbHeader::default(),
        commands: Vec::new(),
    };
    assert!(matches!(
        frame.encode(),
        Err(CodecError::ChainIntegrity(_))
    ));
}

#[test]
fn test_unregistered_command_is_unsupported() {
    use binrw::BinWrite;
    let mut cursor = std::io::Cursor::new(Vec::new());
    SmbHeader::new(SmbCommand::Echo).write(&mut cursor).unwrap();
    // Empty parameter and data blocks.
    cursor.get_mut().extend_from_slice(&[0x00, 0x00, 0x00]);
    assert!(matches!(
        SmbFrame::decode(cursor.get_ref()),
        Err(CodecError::UnsupportedCommand {
            command: SmbCommand::Echo,
            ..
        })
    ));
}

#[test]
fn test_undefined_command_byte_fails_header_parse() {
    let frame = SmbFrame::new(SmbHeader::default(), CloseRequest::default());
    let mut bytes = frame.encode().unwrap();
    bytes[4] = 0xa7;
    assert!(matches!(
        SmbFrame::decode(&bytes),
        Err(CodecError::Parse(_))
    ));
}

#[test]
fn test_clone_independence() {
    let original = TransMailslotWriteRequest {
        name: NullString::from("\\MAILSLOT\\messenger"),
        priority: 1,
        class: 2,
        message: b"hello".to_vec(),
    };
    let image_before = frame_for(&original).encode().unwrap();

    let mut copy = original.clone();
    copy.message.extend_from_slice(b", world");
    copy.name = NullString::from("\\MAILSLOT\\other");

    assert_eq!(frame_for(&original).encode().unwrap(), image_before);
}

fn frame_for(request: &TransMailslotWriteRequest) -> SmbFrame {
    SmbFrame::new(SmbHeader::default(), request.to_transaction().unwrap())
}

#[test]
fn test_mailslot_write_through_transaction_carrier() {
    let request = TransMailslotWriteRequest {
        name: NullString::from("\\MAILSLOT\\messenger"),
        priority: 1,
        class: 2,
        message: b"workstation online".to_vec(),
    };

    let bytes = frame_for(&request).encode().unwrap();
    let decoded = SmbFrame::decode(&bytes).unwrap();
    let CommandBody::TransactionRequest(primary) = &decoded.commands[0] else {
        panic!("expected a transaction primary");
    };

    let reassembly = TransactionReassembly::new(primary).unwrap();
    assert!(reassembly.is_complete());
    let payload = reassembly.finish().unwrap();
    assert_eq!(payload.sub_command(), Some(TRANS_MAILSLOT_WRITE));

    let body = Registry::global()
        .interpret_trans(TRANS_MAILSLOT_WRITE, Direction::Request, &payload)
        .unwrap();
    assert_eq!(body, CommandBody::TransMailslotWriteRequest(request));
}

#[test]
fn test_fragmented_transaction_reassembles() {
    let request = TransactionRequest::new(
        NullString::from("\\PIPE\\sample"),
        vec![0x0026],
        vec![0x11; 60],
        vec![0x22; 400],
    )
    .unwrap();

    let frames = request
        .clone()
        .into_frames(&SmbHeader::default(), 180)
        .unwrap();
    assert!(frames.len() > 1);

    let mut decoded = Vec::new();
    for frame in &frames {
        decoded.push(SmbFrame::decode(&frame.encode().unwrap()).unwrap());
    }

    let CommandBody::TransactionRequest(primary) = &decoded[0].commands[0] else {
        panic!("expected a transaction primary");
    };
    let mut reassembly = TransactionReassembly::new(primary).unwrap();
    for frame in &decoded[1..] {
        let CommandBody::TransactionSecondaryRequest(secondary) = &frame.commands[0] else {
            panic!("expected a transaction secondary");
        };
        reassembly.add_secondary(secondary).unwrap();
    }
    assert!(reassembly.is_complete());

    let payload = reassembly.finish().unwrap();
    assert_eq!(payload.parameters, request.parameters);
    assert_eq!(payload.data, request.data);
    assert_eq!(payload.name, request.name);
}

#[test]
fn test_overlapping_fragment_is_rejected() {
    let request = TransactionRequest::new(
        NullString::from("\\PIPE\\sample"),
        vec![0x0026],
        vec![],
        vec![0x22; 100],
    )
    .unwrap();
    let frames = request.into_frames(&SmbHeader::default(), 120).unwrap();
    assert!(frames.len() > 1);

    let CommandBody::TransactionRequest(primary) = &frames[0].commands[0] else {
        panic!("expected a transaction primary");
    };
    let mut reassembly = TransactionReassembly::new(primary).unwrap();

    let overlapping = TransactionSecondaryRequest {
        total_parameter_count: 0,
        total_data_count: 100,
        parameter_displacement: 0,
        data_displacement: 0,
        parameters: vec![],
        data: vec![0x33; 10],
    };
    assert!(matches!(
        reassembly.add_secondary(&overlapping),
        Err(CodecError::Fragmentation(_))
    ));
}

#[test]
fn test_secondary_with_disagreeing_totals_is_rejected() {
    let request = TransactionRequest::new(
        NullString::from("\\PIPE\\sample"),
        vec![0x0026],
        vec![],
        vec![0x22; 100],
    )
    .unwrap();
    let frames = request.into_frames(&SmbHeader::default(), 120).unwrap();
    let CommandBody::TransactionRequest(primary) = &frames[0].commands[0] else {
        panic!("expected a transaction primary");
    };
    let mut reassembly = TransactionReassembly::new(primary).unwrap();

    let liar = TransactionSecondaryRequest {
        total_parameter_count: 0,
        total_data_count: 90,
        data_displacement: 50,
        data: vec![0x33; 40],
        ..Default::default()
    };
    assert!(matches!(
        reassembly.add_secondary(&liar),
        Err(CodecError::Fragmentation(_))
    ));
}

#[test]
fn test_fragmented_quota_query_round_trip() {
    let quota_request = NtTransQueryQuotaRequest {
        parameters: QueryQuotaParameters {
            fid: 0x4001,
            sid_list_length: 320,
            ..Default::default()
        },
        sid_list: (0..320).map(|i| i as u8).collect(),
    };
    let payload = {
        use cifs_msg::NtTransCodec;
        quota_request.to_payload().unwrap()
    };
    let carrier = NtTransactRequest::new(
        payload.function,
        payload.setup.clone(),
        payload.parameters.clone(),
        payload.data.clone(),
    );

    let frames = carrier.into_frames(&SmbHeader::default(), 200).unwrap();
    assert!(frames.len() > 1);

    let mut decoded = Vec::new();
    for frame in &frames {
        decoded.push(SmbFrame::decode(&frame.encode().unwrap()).unwrap());
    }

    let CommandBody::NtTransactRequest(primary) = &decoded[0].commands[0] else {
        panic!("expected an NT transaction primary");
    };
    assert_eq!(primary.function, NT_TRANSACT_QUERY_QUOTA);
    let mut reassembly = NtTransactReassembly::new(primary).unwrap();
    for frame in &decoded[1..] {
        let CommandBody::NtTransactSecondaryRequest(secondary) = &frame.commands[0] else {
            panic!("expected an NT transaction secondary");
        };
        reassembly.add_secondary(secondary).unwrap();
    }
    assert!(reassembly.is_complete());

    let body = Registry::global()
        .interpret_nt_trans(
            NT_TRANSACT_QUERY_QUOTA,
            Direction::Request,
            &reassembly.finish().unwrap(),
        )
        .unwrap();
    assert_eq!(body, CommandBody::NtTransQueryQuotaRequest(quota_request));
}

#[test]
fn test_close_response_frame() {
    let frame = SmbFrame::new(
        SmbHeader::new(SmbCommand::Close).into_response(),
        CloseResponse,
    );
    let bytes = frame.encode().unwrap();
    // Header + empty word count + zero byte count.
    assert_eq!(bytes.len(), 35);
    assert_eq!(SmbFrame::decode(&bytes).unwrap(), frame);
}
