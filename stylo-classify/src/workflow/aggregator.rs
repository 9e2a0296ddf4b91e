//! Result assembly
//!
//! Concurrent classification completes in any order; results carry the index of
//! the paragraph they belong to and are put back in paragraph order here.

use stylo_common::{BookRecord, ChapterRecord, Classification, ClassificationTask, ParagraphResult};

/// Build a chapter record from `(paragraph index, classification)` pairs
///
/// A paragraph without a result gets the task's sentinel; if an index appears
/// twice the later result wins. Indices outside `paragraphs` are ignored.
pub fn assemble_chapter<I>(
    chapter: usize,
    task: ClassificationTask,
    paragraphs: &[&str],
    completed: I,
) -> ChapterRecord
where
    I: IntoIterator<Item = (usize, Classification)>,
{
    let mut slots: Vec<Option<Classification>> = vec![None; paragraphs.len()];
    for (index, classification) in completed {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(classification);
        }
    }

    let results = paragraphs
        .iter()
        .zip(slots)
        .map(|(paragraph, slot)| {
            ParagraphResult::new(*paragraph, slot.unwrap_or_else(|| task.sentinel()))
        })
        .collect();

    ChapterRecord {
        chapter,
        task,
        results,
    }
}

/// Build a book record ordered by chapter index
pub fn assemble_book<I>(chapters: I) -> BookRecord
where
    I: IntoIterator<Item = ChapterRecord>,
{
    let mut chapters: Vec<ChapterRecord> = chapters.into_iter().collect();
    chapters.sort_by_key(|c| c.chapter);
    BookRecord { chapters }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylo_common::Emotion;

    #[test]
    fn test_out_of_order_results_are_reassociated() {
        let paragraphs = ["first", "second", "third"];
        let completed = vec![
            (2, Classification::Emotion(Emotion::Mad)),
            (0, Classification::Emotion(Emotion::Joy)),
            (1, Classification::Emotion(Emotion::Sad)),
        ];

        let record = assemble_chapter(4, ClassificationTask::EmotionLabel, &paragraphs, completed);

        assert_eq!(record.chapter, 4);
        let labels: Vec<_> = record
            .results
            .iter()
            .map(|r| (r.paragraph.as_str(), r.classification.clone()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("first", Classification::Emotion(Emotion::Joy)),
                ("second", Classification::Emotion(Emotion::Sad)),
                ("third", Classification::Emotion(Emotion::Mad)),
            ]
        );
    }

    #[test]
    fn test_missing_result_becomes_sentinel() {
        let paragraphs = ["a", "b"];
        let record = assemble_chapter(
            1,
            ClassificationTask::EmotionIntensity,
            &paragraphs,
            vec![(0, Classification::Emotions([("Joy".to_string(), 0.5)].into()))],
        );

        assert!(!record.results[0].classification.is_sentinel());
        assert!(record.results[1].classification.is_sentinel());
        assert_eq!(record.sentinel_count(), 1);
    }

    #[test]
    fn test_book_sorted_by_chapter() {
        let chapter = |n| ChapterRecord {
            chapter: n,
            task: ClassificationTask::Aspect,
            results: Vec::new(),
        };
        let book = assemble_book(vec![chapter(3), chapter(1), chapter(2)]);
        let order: Vec<_> = book.chapters.iter().map(|c| c.chapter).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
