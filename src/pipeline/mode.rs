// SPDX-License-Identifier: GPL-3.0-only

//! Host configuration commands

use crate::constants::commands;

/// A decoded `set_mode(item, option)` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCommand {
    /// Toggle the HDR compute stage
    SetHdr(bool),
    /// Item/option pair with no meaning yet; extension point for new settings
    Ignored { item: i32, option: i32 },
}

impl ModeCommand {
    pub fn from_raw(item: i32, option: i32) -> Self {
        match (item, option) {
            (commands::ITEM_HDR, commands::OPTION_ON) => ModeCommand::SetHdr(true),
            (commands::ITEM_HDR, commands::OPTION_OFF) => ModeCommand::SetHdr(false),
            _ => ModeCommand::Ignored { item, option },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hdr_item() {
        assert_eq!(ModeCommand::from_raw(0, 0), ModeCommand::SetHdr(true));
        assert_eq!(ModeCommand::from_raw(0, 1), ModeCommand::SetHdr(false));
    }

    #[test]
    fn test_unknown_item_or_option_is_ignored() {
        assert_eq!(
            ModeCommand::from_raw(3, 0),
            ModeCommand::Ignored { item: 3, option: 0 }
        );
        assert_eq!(
            ModeCommand::from_raw(0, 7),
            ModeCommand::Ignored { item: 0, option: 7 }
        );
    }
}
