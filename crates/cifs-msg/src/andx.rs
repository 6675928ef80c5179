//! AndX chaining: batching multiple commands into one physical frame.
//!
//! An AndX-capable command opens its parameter words with a 4-byte link:
//! next command id, a reserved byte, and the frame-relative offset where
//! the next command's parameter block begins. The walker here owns that
//! prefix entirely; codecs and consumers only ever see decoded bodies.

use binrw::BinWriterExt;
use binrw::prelude::*;

use crate::block::{DataBlock, ParameterBlock};
use crate::error::{CodecError, Result};
use crate::header::{SmbCommand, SmbHeader};
use crate::packet::CommandBody;
use crate::registry::Registry;

/// A decoded link to the next command in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AndxLink {
    pub command: SmbCommand,
    pub offset: u16,
}

impl AndxLink {
    /// The terminal link: command id 0xFF, offset 0.
    pub const SENTINEL: AndxLink = AndxLink {
        command: SmbCommand::NoAndxCommand,
        offset: 0,
    };

    pub fn is_sentinel(&self) -> bool {
        self.command == SmbCommand::NoAndxCommand
    }
}

/// Removes the link prefix from the head of an AndX-capable command's
/// parameter words, leaving only the command's own words.
fn strip_link(parameters: &mut ParameterBlock) -> Result<AndxLink> {
    if parameters.words.len() < 2 {
        return Err(CodecError::format(
            "AndXCommand",
            "parameter block too short for an AndX link",
        ));
    }
    let raw_command = (parameters.words[0] & 0xff) as u8;
    let command = SmbCommand::from_u8(raw_command).ok_or_else(|| {
        CodecError::ChainIntegrity(format!("link names undefined command id {raw_command:#04x}"))
    })?;
    let offset = parameters.words[1];
    parameters.words.drain(..2);
    Ok(AndxLink { command, offset })
}

/// Walks a frame's command chain, decoding each linked command via the
/// registry. Bounded by the buffer: every link must strictly advance
/// past the current command and stay inside the frame.
pub(crate) fn decode_chain(
    buffer: &[u8],
    header: &SmbHeader,
    registry: &Registry,
) -> Result<Vec<CommandBody>> {
    let direction = header.direction();
    let mut commands = Vec::new();
    let mut command = header.command;
    let mut at = SmbHeader::STRUCT_SIZE as u64;

    loop {
        if at as usize >= buffer.len() {
            return Err(CodecError::ChainIntegrity(format!(
                "offset {at} points outside the {}-byte frame",
                buffer.len()
            )));
        }

        let descriptor = registry.lookup(command, None, direction)?;

        let mut cursor = std::io::Cursor::new(buffer);
        cursor.set_position(at);
        let mut parameters = ParameterBlock::read(&mut cursor)?;
        let link = if descriptor.andx_capable() {
            Some(strip_link(&mut parameters)?)
        } else {
            None
        };
        let data = DataBlock::read(&mut cursor)?;
        let end = cursor.position();

        commands.push(descriptor.decode_frame(&parameters, &data, at)?);

        match link {
            None => break,
            Some(link) if link.is_sentinel() => break,
            Some(link) => {
                let offset = link.offset as u64;
                // Strict advance rejects cycles, self-links and revisits
                // with a single check.
                if offset < end {
                    return Err(CodecError::ChainIntegrity(format!(
                        "offset {offset} does not advance past the command ending at {end}"
                    )));
                }
                command = link.command;
                at = offset;
            }
        }
    }

    Ok(commands)
}

/// Serializes a command chain after the header, backpatching each link
/// once the following command's position is known.
pub(crate) fn encode_chain(header: &SmbHeader, commands: &[CommandBody]) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    header.write(&mut cursor)?;

    // Frame-absolute position of the previous command's link prefix,
    // still holding the sentinel placeholder.
    let mut pending_link: Option<u64> = None;

    for (i, body) in commands.iter().enumerate() {
        let at = cursor.position();
        if let Some(prefix_pos) = pending_link.take() {
            patch_link(&mut cursor, prefix_pos, body.command(), at)?;
        } else if i > 0 {
            return Err(CodecError::ChainIntegrity(format!(
                "{:?} cannot link a following command",
                commands[i - 1].command()
            )));
        }

        let (parameters, data) = body.to_blocks(at)?;
        if body.andx_capable() {
            // Placeholder prefix; patched when the next command lands,
            // or left as the sentinel for the chain tail.
            let mut words = Vec::with_capacity(parameters.words.len() + 2);
            words.push(SmbCommand::NoAndxCommand as u16);
            words.push(0);
            words.extend_from_slice(&parameters.words);
            pending_link = Some(at + 1);
            ParameterBlock::from(words).write(&mut cursor)?;
        } else {
            parameters.write(&mut cursor)?;
        }
        data.write(&mut cursor)?;
    }

    Ok(cursor.into_inner())
}

fn patch_link(
    cursor: &mut std::io::Cursor<Vec<u8>>,
    prefix_pos: u64,
    command: SmbCommand,
    at: u64,
) -> Result<()> {
    let offset: u16 = at.try_into().map_err(|_| {
        CodecError::ChainIntegrity(format!("offset {at} of the next command overflows 16 bits"))
    })?;
    let return_to = cursor.position();
    cursor.set_position(prefix_pos);
    cursor.write_le(&(command as u8))?;
    cursor.write_le(&0u8)?;
    cursor.write_le(&offset)?;
    cursor.set_position(return_to);
    Ok(())
}
