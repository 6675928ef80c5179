//! 8-bit boolean, per [MS-DTYP] 2.2.4: zero is false, anything else true.

use binrw::prelude::*;

#[binrw::binrw]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Boolean(
    #[br(map = |x: u8| x != 0)]
    #[bw(map = |&b| u8::from(b))]
    pub bool,
);

impl From<bool> for Boolean {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl From<Boolean> for bool {
    fn from(value: Boolean) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    cifs_tests::test_binrw! {
        Boolean => set: Boolean(true) => "01"
    }

    cifs_tests::test_binrw_write! {
        Boolean => clear: Boolean(false) => "00"
    }
}
