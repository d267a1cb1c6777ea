/// Stable file identifier (usually the path the corpus reader found it at).
/// Example: `corpus/rtl/alu/alu_32.v`
pub type FileId = String;
/// File name (base name) carried on chunks and examples.
/// Example: `alu_32.v`
pub type FileName = String;
/// Integer id produced by an external tokenizer.
/// Examples: `72`, `50300`
pub type TokenId = u32;
/// Reserved word of the target language.
/// Examples: `module`, `endmodule`, `posedge`
pub type KeywordText = String;
/// Human-readable reason a file was skipped or failed.
/// Examples: `contains NUL bytes`, `iverilog timed out after 30s`
pub type SkipReason = String;
