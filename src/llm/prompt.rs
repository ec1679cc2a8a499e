//! Prompt builder for Vietnamese text correction with causal LMs.
//!
//! The instruction asks for two tagged sections, [`CORRECTED_TAG`] followed
//! by [`EXPLANATION_TAG`], and ends with an open [`CORRECTED_TAG`] cue so the
//! model starts writing the answer immediately.  Models still echo the
//! format block back at times, which is why
//! [`parse_generation`](crate::llm::parse_generation) keeps the last tagged
//! block only.

/// Open tag of the corrected-text section.
pub const CORRECTED_TAG: &str = "[VĂN BẢN ĐÃ SỬA]";

/// Open tag of the explanation section.
pub const EXPLANATION_TAG: &str = "[GIẢI THÍCH]";

/// Marker used by an older, untagged answer format.
pub const LEGACY_MARKER: &str = "Đoạn văn đã sửa:";

/// System instruction shared by the local and remote causal LMs.
pub const SYSTEM_PROMPT: &str = "\
Bạn là chuyên gia biên tập tiếng Việt.

NHIỆM VỤ:
- Sửa lỗi chính tả, ngữ pháp, dấu câu trong TOÀN BỘ câu/đoạn văn
- GIỮ NGUYÊN ý nghĩa và ngữ cảnh gốc - KHÔNG ĐƯỢC thay đổi nội dung
- Trả về TOÀN BỘ câu/đoạn văn đã sửa, KHÔNG chỉ trả về từ được sửa

QUY TẮC QUAN TRỌNG:
1. Ưu tiên sửa thành từ/cụm từ PHÙ HỢP VỚI NGỮ CẢNH câu
2. Nhận diện địa danh Việt Nam: chùa Hương, Hồ Gươm, Hạ Long, Sapa, Đà Lạt, Huế, Sài Gòn...
3. KHÔNG đoán bừa - nếu không chắc chắn thì giữ nguyên từ gốc
4. KHÔNG thêm nội dung mới, KHÔNG thay đổi ý nghĩa
5. Nếu câu đúng thì giữ nguyên hoàn toàn
6. Kiểm tra kỹ các dấu câu trong tiếng Việt

VÍ DỤ (trả về TOÀN BỘ câu đã sửa):
- Input: \"hom qua em di chau Huong\" → Output: \"Hôm qua em đi chùa Hương\"
- Input: \"toi di Ho Guom\" → Output: \"Tôi đi Hồ Gươm\"
- Input: \"anh ay la bac si\" → Output: \"Anh ấy là bác sĩ\"

CHỈ TRẢ VỀ ĐÚNG 1 LẦN theo format yêu cầu, KHÔNG lặp lại.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds correction prompts in either flat or chat-message format.
///
/// # Example
/// ```rust
/// use viet_corrector::llm::{PromptBuilder, CORRECTED_TAG};
///
/// let (system, user) = PromptBuilder::new().build_chat("toi di hoc");
/// assert!(system.contains("tiếng Việt"));
/// assert!(user.trim_end().ends_with(CORRECTED_TAG));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Single prompt string for raw-completion runtimes: system instruction
    /// followed by the user message.
    pub fn build(&self, text: &str) -> String {
        format!("{SYSTEM_PROMPT}\n\n{}", self.user_message(text))
    }

    /// `(system_msg, user_msg)` pair for chat APIs.
    pub fn build_chat(&self, text: &str) -> (String, String) {
        (SYSTEM_PROMPT.to_string(), self.user_message(text))
    }

    fn user_message(&self, text: &str) -> String {
        format!(
            "Đoạn văn gốc:\n{text}\n\n\
             Trả lời theo format (CHỈ 1 LẦN, KHÔNG lặp lại):\n\
             {CORRECTED_TAG}\n\
             (viết đoạn văn đã sửa ở đây)\n\n\
             {EXPLANATION_TAG}\n\
             (liệt kê các thay đổi ở đây một cách ngắn gọn nhất)\n\n\
             Bắt đầu:\n\
             {CORRECTED_TAG}\n"
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
