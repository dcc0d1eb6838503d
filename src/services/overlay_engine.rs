//! 批注叠加引擎 - 业务能力层
//!
//! 把原文和批注列表切分成可渲染的片段序列。
//!
//! ## 保证
//! - 所有片段按顺序拼接后与原文完全一致
//! - 片段首尾相接：`segments[i].end_index == segments[i + 1].start_index`
//! - 至少返回一个片段（空文本时为一个空片段）
//!
//! ## 重叠处理
//! 游标只向前移动，先出现的批注占据文本；后面与之重叠的批注
//! 只能标注游标之后的部分，完全被覆盖时不产生片段。
//! 这一"先到先得"的截断行为是现有的对外行为，重叠批注是否应拆分为
//! 多重批注片段、还是在接收时直接拒绝，目前没有定论。

use crate::models::{Annotation, AnnotationType, Severity, TextSegment};

/// 批注筛选条件，`None` 表示"全部"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationFilter {
    pub kind: Option<AnnotationType>,
    pub category: Option<String>,
    pub severity: Option<Severity>,
}

impl AnnotationFilter {
    /// 不做任何筛选
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_kind(mut self, kind: Option<AnnotationType>) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Option<Severity>) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_all(&self) -> bool {
        self.kind.is_none() && self.category.is_none() && self.severity.is_none()
    }

    /// 三个维度都满足才算匹配
    pub fn matches(&self, annotation: &Annotation) -> bool {
        self.kind.map_or(true, |k| annotation.kind == k)
            && self
                .category
                .as_deref()
                .map_or(true, |c| annotation.category == c)
            && self.severity.map_or(true, |s| annotation.severity == s)
    }
}

/// 切分文本
///
/// 偏移量按字符计算；越界、负数、倒置的区间都会被裁剪。
pub fn build_segments<'a>(
    text: &'a str,
    annotations: &'a [Annotation],
    filter: &AnnotationFilter,
    visible: bool,
) -> Vec<TextSegment<'a>> {
    let boundaries = char_boundaries(text);
    let char_len = boundaries.len() - 1;
    let whole = || {
        vec![TextSegment {
            text,
            start_index: 0,
            end_index: char_len,
            annotation: None,
        }]
    };

    if !visible {
        return whole();
    }

    let mut selected: Vec<&Annotation> = annotations.iter().filter(|a| filter.matches(a)).collect();
    if selected.is_empty() {
        return whole();
    }
    // 稳定排序，起点相同的保持原顺序
    selected.sort_by_key(|a| a.start_index);

    let slice = |start: usize, end: usize| -> &'a str { &text[boundaries[start]..boundaries[end]] };
    let mut segments = Vec::with_capacity(selected.len() * 2 + 1);
    let mut cursor = 0usize;

    for annotation in selected {
        let start = clamp_index(annotation.start_index, char_len).max(cursor);
        let end = clamp_index(annotation.end_index, char_len).max(start);

        if start > cursor {
            segments.push(TextSegment {
                text: slice(cursor, start),
                start_index: cursor,
                end_index: start,
                annotation: None,
            });
        }
        if end > start {
            segments.push(TextSegment {
                text: slice(start, end),
                start_index: start,
                end_index: end,
                annotation: Some(annotation),
            });
        }
        cursor = end;
    }

    if cursor < char_len {
        segments.push(TextSegment {
            text: slice(cursor, char_len),
            start_index: cursor,
            end_index: char_len,
            annotation: None,
        });
    }

    if segments.is_empty() {
        return whole();
    }
    segments
}

/// 每个字符的起始字节位置，末尾追加 `text.len()`
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn clamp_index(index: i64, char_len: usize) -> usize {
    if index <= 0 {
        0
    } else {
        usize::try_from(index).map_or(char_len, |i| i.min(char_len))
    }
}

/// 批注叠加引擎
///
/// 持有筛选条件和显示开关；切换筛选不会修改批注本身，
/// 每次调用 `segments` 都重新计算。
#[derive(Debug, Clone)]
pub struct AnnotationOverlayEngine {
    filter: AnnotationFilter,
    visible: bool,
}

impl Default for AnnotationOverlayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationOverlayEngine {
    pub fn new() -> Self {
        Self {
            filter: AnnotationFilter::all(),
            visible: true,
        }
    }

    pub fn filter(&self) -> &AnnotationFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: AnnotationFilter) {
        self.filter = filter;
    }

    /// 恢复为"全部"
    pub fn reset_filter(&mut self) {
        self.filter = AnnotationFilter::all();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// 当前条件下匹配的批注数量
    pub fn matching_count(&self, annotations: &[Annotation]) -> usize {
        annotations.iter().filter(|a| self.filter.matches(a)).count()
    }

    pub fn segments<'a>(&self, text: &'a str, annotations: &'a [Annotation]) -> Vec<TextSegment<'a>> {
        build_segments(text, annotations, &self.filter, self.visible)
    }
}
