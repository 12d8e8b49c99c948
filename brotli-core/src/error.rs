//! Error types for the Brotli encoder and decoder.
//!
//! The variant families mirror the error-code vocabulary of RFC 7932's
//! reference implementation: `Format*` for malformed streams, `Alloc*` for
//! allocation-manager failures, and `Unreachable*` for internal invariant
//! violations that indicate a bug rather than corrupted input.

use thiserror::Error;

/// The result type used throughout `brotli-core`.
pub type Result<T> = std::result::Result<T, BrotliError>;

/// A copyable classification of a [`BrotliError`], returned by
/// `GetErrorCode`-style accessors so callers can inspect the failure kind
/// without holding on to (or cloning) the full error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No error has occurred.
    None,
    /// A reserved bit was set where the format requires zero.
    FormatReservedBit,
    /// A Huffman code-length vector did not satisfy the Kraft inequality.
    FormatHuffmanSpace,
    /// A simple Huffman code listed the same symbol more than once.
    FormatSimpleHuffmanDuplicate,
    /// A meta-block's declared size exceeded the permitted nibble count.
    FormatExuberantNibble,
    /// A context map referenced a cluster beyond `num_clusters`.
    FormatContextMapRepeat,
    /// A block-length or symbol count of zero where the format forbids it.
    FormatBlockLengthZero,
    /// A static-dictionary transform index was out of range.
    FormatTransform,
    /// A static-dictionary reference ran past the dictionary bounds.
    FormatDictionary,
    /// `lgwin` fell outside the 10..24 range the format allows.
    FormatWindowBits,
    /// Non-zero bits found in trailing stream padding.
    FormatPadding,
    /// Any other malformed-stream condition not covered by a more specific
    /// variant (distance, command, or header range validation).
    FormatGeneric,
    /// Failed to allocate the context-mode table.
    AllocContextModes,
    /// Failed to allocate a Huffman tree group.
    AllocTreeGroups,
    /// Failed to allocate a context map.
    AllocContextMap,
    /// Failed to allocate the ring buffer.
    AllocRingBuffer,
    /// Failed to allocate block-type Huffman trees.
    AllocBlockTypeTrees,
    /// An internal invariant was violated; this is a bug, not corrupted input.
    Unreachable,
}

/// The main error type for `brotli-core` operations.
#[derive(Debug, Error)]
pub enum BrotliError {
    /// I/O error from an underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A reserved header bit was set.
    #[error("reserved bit set at bit position {bit_position}")]
    ReservedBitSet {
        /// Bit offset where the violation was found.
        bit_position: u64,
    },

    /// A Huffman code-length vector over- or under-subscribes the code space
    /// and cannot be repaired.
    #[error("invalid Huffman code lengths: {message}")]
    HuffmanSpace {
        /// Description of the Kraft-sum violation.
        message: String,
    },

    /// A simple Huffman code (1..4 symbols) repeated a symbol.
    #[error("simple Huffman code contains a duplicate symbol")]
    SimpleHuffmanDuplicate,

    /// A meta-block length nibble count or value was out of range.
    #[error("invalid meta-block length encoding: {message}")]
    ExuberantNibble {
        /// Description of the offending field.
        message: String,
    },

    /// Invalid or out-of-range context map entry.
    #[error("invalid context map: {message}")]
    ContextMap {
        /// Description of the violation.
        message: String,
    },

    /// A block-split or command field was zero where the format forbids it.
    #[error("zero-length field encountered: {message}")]
    BlockLengthZero {
        /// Description of the offending field.
        message: String,
    },

    /// An invalid static-dictionary transform index or word id.
    #[error("invalid static dictionary transform: {message}")]
    InvalidTransform {
        /// Description of the violation.
        message: String,
    },

    /// A static-dictionary reference overflowed the dictionary bounds.
    #[error("static dictionary overflow: {message}")]
    DictionaryOverflow {
        /// Description of the violation.
        message: String,
    },

    /// `lgwin` was outside the permitted 10..24 range.
    #[error("invalid window size: lgwin={lgwin}")]
    InvalidWindowBits {
        /// The offending value.
        lgwin: u32,
    },

    /// Non-zero padding bits at the end of the stream.
    #[error("non-zero padding bits at stream end")]
    NonZeroPadding,

    /// A distance, command, or copy field failed validation.
    #[error("corrupted data at bit position {bit_position}: {message}")]
    Corrupted {
        /// Bit offset where corruption was detected.
        bit_position: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The bit reader ran out of buffered bytes before satisfying a read.
    /// A one-shot caller treats this the same as any other format error;
    /// the streaming decoder (`decoder_state`) treats it as a request for
    /// more input and retries once more bytes are fed in.
    #[error("ran out of input at bit position {bit_position}")]
    NeedsMoreInput {
        /// Bit offset at which buffered input was exhausted.
        bit_position: u64,
    },

    /// An allocation-manager failure. The instance becomes unusable.
    #[error("allocation failure: {what}")]
    Alloc {
        /// Which allocation failed.
        what: &'static str,
    },

    /// A caller-contract violation: parameter changed after initialisation,
    /// input fed after `Finish`, and similar misuse.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of the violation.
        message: String,
    },

    /// An internal invariant was violated. This indicates a bug in
    /// `brotli-core`, not corrupted input.
    #[error("unreachable state: {message}")]
    Unreachable {
        /// Description of the violated invariant.
        message: String,
    },
}

impl BrotliError {
    /// Classify this error into the copyable [`ErrorCode`] vocabulary.
    pub fn code(&self) -> ErrorCode {
        match self {
            BrotliError::Io(_) => ErrorCode::FormatGeneric,
            BrotliError::ReservedBitSet { .. } => ErrorCode::FormatReservedBit,
            BrotliError::HuffmanSpace { .. } => ErrorCode::FormatHuffmanSpace,
            BrotliError::SimpleHuffmanDuplicate => ErrorCode::FormatSimpleHuffmanDuplicate,
            BrotliError::ExuberantNibble { .. } => ErrorCode::FormatExuberantNibble,
            BrotliError::ContextMap { .. } => ErrorCode::FormatContextMapRepeat,
            BrotliError::BlockLengthZero { .. } => ErrorCode::FormatBlockLengthZero,
            BrotliError::InvalidTransform { .. } => ErrorCode::FormatTransform,
            BrotliError::DictionaryOverflow { .. } => ErrorCode::FormatDictionary,
            BrotliError::InvalidWindowBits { .. } => ErrorCode::FormatWindowBits,
            BrotliError::NonZeroPadding => ErrorCode::FormatPadding,
            BrotliError::Corrupted { .. } => ErrorCode::FormatGeneric,
            BrotliError::NeedsMoreInput { .. } => ErrorCode::FormatGeneric,
            BrotliError::InvalidOperation { .. } => ErrorCode::FormatGeneric,
            BrotliError::Alloc { what } => match *what {
                "context_modes" => ErrorCode::AllocContextModes,
                "tree_groups" => ErrorCode::AllocTreeGroups,
                "context_map" => ErrorCode::AllocContextMap,
                "block_type_trees" => ErrorCode::AllocBlockTypeTrees,
                _ => ErrorCode::AllocRingBuffer,
            },
            BrotliError::Unreachable { .. } => ErrorCode::Unreachable,
        }
    }

    /// Build a [`BrotliError::Corrupted`].
    pub fn corrupted(bit_position: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            bit_position,
            message: message.into(),
        }
    }

    /// Build a [`BrotliError::Unreachable`].
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Build a [`BrotliError::InvalidOperation`].
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// True if this error is [`BrotliError::NeedsMoreInput`] — the
    /// streaming decoder's cue to retry once more bytes are fed in rather
    /// than surface a format error.
    pub fn is_needs_more_input(&self) -> bool {
        matches!(self, BrotliError::NeedsMoreInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_classification() {
        assert_eq!(
            BrotliError::InvalidWindowBits { lgwin: 30 }.code(),
            ErrorCode::FormatWindowBits
        );
        assert_eq!(
            BrotliError::Alloc { what: "context_map" }.code(),
            ErrorCode::AllocContextMap
        );
        assert_eq!(
            BrotliError::unreachable("bad state").code(),
            ErrorCode::Unreachable
        );
    }

    #[test]
    fn display_messages_are_informative() {
        let err = BrotliError::corrupted(42, "bad distance");
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("bad distance"));
    }
}
