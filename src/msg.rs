use std::path::PathBuf;

use custom_formatters::FormatError;
use custom_formatters::formatter::Edits;
use custom_formatters::model::document::Document;

/// All messages that drive the serve loop.
#[derive(Debug)]
pub enum Msg {
    // -- Requests
    FormatFile(PathBuf),
    FormatFinished {
        document: Document,
        result: Result<Edits, FormatError>,
    },

    // -- Settings
    SettingsChanged,

    // -- System
    InputClosed,
}
