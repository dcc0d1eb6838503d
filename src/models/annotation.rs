//! 批注与文本片段
//!
//! 批注由评分后端生成，偏移量以字符（Unicode scalar）计，
//! 指向随批注一起返回的同一份作文文本。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 批注类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    #[serde(alias = "Error", alias = "ERROR")]
    Error,
    #[serde(alias = "Suggestion", alias = "SUGGESTION")]
    Suggestion,
    #[serde(alias = "Highlight", alias = "HIGHLIGHT")]
    Highlight,
}

/// 严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "Low", alias = "LOW", alias = "minor")]
    Low,
    #[serde(alias = "Medium", alias = "MEDIUM", alias = "moderate")]
    Medium,
    #[serde(alias = "High", alias = "HIGH", alias = "major")]
    High,
}

/// 后端返回的批注
///
/// 期望 `0 <= start_index <= end_index`，但后端并不保证，
/// 因此索引保留为有符号整数，由叠加引擎负责裁剪。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub start_index: i64,
    pub end_index: i64,
    #[serde(rename = "type")]
    pub kind: AnnotationType,
    #[serde(default)]
    pub category: String,
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_correction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Annotation {
    pub fn new(
        start_index: i64,
        end_index: i64,
        kind: AnnotationType,
        category: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            start_index,
            end_index,
            kind,
            category: category.into(),
            severity,
            message: message.into(),
            suggested_correction: None,
            explanation: None,
        }
    }

    #[must_use]
    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.suggested_correction = Some(correction.into());
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// 渲染用的文本片段
///
/// 只在渲染时临时计算，借用原文与批注，不做持久化。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSegment<'a> {
    pub text: &'a str,
    /// 字符偏移（含）
    pub start_index: usize,
    /// 字符偏移（不含）
    pub end_index: usize,
    pub annotation: Option<&'a Annotation>,
}

impl TextSegment<'_> {
    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }
}

/// 批注统计（按类型、按严重程度）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationStats {
    pub total: usize,
    pub by_type: BTreeMap<AnnotationType, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

impl AnnotationStats {
    pub fn from_annotations(annotations: &[Annotation]) -> Self {
        let mut stats = Self {
            total: annotations.len(),
            ..Default::default()
        };
        for annotation in annotations {
            *stats.by_type.entry(annotation.kind).or_insert(0) += 1;
            *stats.by_severity.entry(annotation.severity).or_insert(0) += 1;
        }
        stats
    }

    pub fn count_of(&self, kind: AnnotationType) -> usize {
        self.by_type.get(&kind).copied().unwrap_or(0)
    }
}

/// 批注中出现过的分类（去重、排序），用于筛选下拉框
pub fn available_categories(annotations: &[Annotation]) -> Vec<String> {
    let mut categories: Vec<String> = annotations
        .iter()
        .map(|a| a.category.clone())
        .filter(|c| !c.is_empty())
        .collect();
    categories.sort();
    categories.dedup();
    categories
}
