//! # 단어 수 계산 엔진
//!
//! 에디터가 보내는 HTML 본문에서 단어 수를 계산하고,
//! 씬 → 챕터 → 문서 방향으로 합산합니다.
//!
//! 계산 순서:
//! 1. `<...>` 태그를 공백 하나로 치환
//! 2. HTML 엔티티 디코딩 (`&amp;` → `&`)
//! 3. `\b\w+\b`에 맞는 단어(문자·숫자·밑줄의 연속)를 셈
//!
//! 합산은 항상 자식 전체를 다시 더하는 **전체 재계산**입니다.
//! 증분(delta) 갱신을 하지 않으므로 어떤 경로로 수정되었든 합계가 어긋나지 않습니다.

use crate::models::{Chapter, Scene};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));

/// 본문이 없으면(`None`) 0, 있으면 `count_html()`과 같습니다.
pub fn count_words(html: Option<&str>) -> i64 {
    html.map(count_html).unwrap_or(0)
}

/// HTML 본문의 단어 수를 계산합니다. 빈 문자열은 0입니다.
pub fn count_html(html: &str) -> i64 {
    if html.is_empty() {
        return 0;
    }

    let text = TAG_RE.replace_all(html, " ");
    let text = html_escape::decode_html_entities(&text);
    WORD_RE.find_iter(&text).count() as i64
}

pub fn sum_scene_wordcounts(scenes: &[Scene]) -> i64 {
    scenes.iter().map(|s| s.wordcount).sum()
}

pub fn sum_chapter_wordcounts(chapters: &[Chapter]) -> i64 {
    chapters.iter().map(|c| c.wordcount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_before_counting() {
        assert_eq!(count_html("<p>Hello <b>world</b></p>"), 2);
    }

    #[test]
    fn empty_and_missing_content_count_zero() {
        assert_eq!(count_words(None), 0);
        assert_eq!(count_words(Some("")), 0);
        assert_eq!(count_words(Some("<p>two words</p>")), 2);
        assert_eq!(count_html(""), 0);
        assert_eq!(count_html("   "), 0);
        assert_eq!(count_html("<p></p><br/>"), 0);
    }

    #[test]
    fn punctuation_is_not_a_word() {
        assert_eq!(count_html("Hello, world! 123"), 3);
        assert_eq!(count_html("... --- !!!"), 0);
    }

    #[test]
    fn adjacent_tags_do_not_glue_words_together() {
        assert_eq!(count_html("<p>one</p><p>two</p>"), 2);
    }

    #[test]
    fn entities_are_decoded_after_stripping() {
        // "Tom & Jerry" -> the ampersand is punctuation
        assert_eq!(count_html("Tom &amp; Jerry"), 2);
        // "don't" splits at the apostrophe
        assert_eq!(count_html("don&#39;t"), 2);
        // an escaped tag is text, not markup
        assert_eq!(count_html("&lt;b&gt;bold&lt;/b&gt;"), 3);
    }

    #[test]
    fn underscores_and_unicode_letters_are_word_characters() {
        assert_eq!(count_html("snake_case word"), 2);
        assert_eq!(count_html("<p>café naïve 한글</p>"), 3);
    }

    #[test]
    fn is_deterministic() {
        let html = "<h1>Title</h1><p>Some <em>body</em> text.</p>";
        assert_eq!(count_html(html), count_html(html));
        assert_eq!(count_html(html), 4);
    }

    #[test]
    fn sums_children() {
        let scenes = vec![
            Scene {
                id: "s1".into(),
                title: "a".into(),
                order: 0,
                content: String::new(),
                wordcount: 3,
            },
            Scene {
                id: "s2".into(),
                title: "b".into(),
                order: 1,
                content: String::new(),
                wordcount: 4,
            },
        ];
        assert_eq!(sum_scene_wordcounts(&scenes), 7);

        let chapters = vec![
            Chapter {
                id: "c1".into(),
                title: "one".into(),
                order: 0,
                wordcount: 7,
                scenes,
            },
            Chapter {
                id: "c2".into(),
                title: "two".into(),
                order: 1,
                wordcount: 5,
                scenes: vec![],
            },
        ];
        assert_eq!(sum_chapter_wordcounts(&chapters), 12);
    }
}
