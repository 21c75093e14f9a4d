// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Identifier extraction and matching for sponsored candidates

use scraper::{ElementRef, Selector};

use super::extractor::{compile_selector, SponsoredCandidate};
use super::types::PlacementError;

/// Pulls a product identifier out of a result element
///
/// Fallback chain, first non-empty value wins:
/// 1. the attribute on the element itself
/// 2. the first descendant `div` carrying a non-empty value
/// 3. the first descendant of any kind carrying a non-empty value
pub struct IdentifierMatcher {
    attribute: String,
    nested_div: Selector,
    nested_any: Selector,
}

impl IdentifierMatcher {
    pub fn new(attribute: &str) -> Result<Self, PlacementError> {
        Ok(Self {
            attribute: attribute.to_string(),
            nested_div: compile_selector(&format!("div[{}]", attribute))?,
            nested_any: compile_selector(&format!("[{}]", attribute))?,
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Identifier carried by an element, if any
    pub fn extract_identifier(&self, element: &ElementRef) -> Option<String> {
        non_empty(element.value().attr(&self.attribute))
            .or_else(|| self.first_nested(element, &self.nested_div))
            .or_else(|| self.first_nested(element, &self.nested_any))
    }

    /// First descendant matching `selector` whose attribute value is non-empty
    fn first_nested(&self, element: &ElementRef, selector: &Selector) -> Option<String> {
        element
            .select(selector)
            .find_map(|found| non_empty(found.value().attr(&self.attribute)))
    }

    /// Identifier of a sponsored candidate, if any
    pub fn match_identifier(&self, candidate: &SponsoredCandidate) -> Option<String> {
        self.extract_identifier(&candidate.element)
    }

    /// Position of the first candidate whose identifier equals the target.
    ///
    /// Candidates without an identifier never match.
    pub fn find_rank(&self, candidates: &[SponsoredCandidate], target: &str) -> Option<usize> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }

        candidates
            .iter()
            .find(|candidate| self.match_identifier(candidate).as_deref() == Some(target))
            .map(|candidate| candidate.position)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
