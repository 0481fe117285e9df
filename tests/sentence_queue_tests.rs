//! Sentence Queue Tests
//!
//! Producer/consumer scenarios for the sentence queue, including a consumer
//! that follows open sentences while several producers write concurrently.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use waav_voice_chat::core::sentence::{Sentence, SentenceQueue};

fn describe(sentence: &Sentence) -> String {
    sentence.to_string()
}

#[test]
fn test_happy_then_sad_conversation() {
    let queue = SentenceQueue::new();
    queue.set_emotion("happy");
    queue.append_text("Hello, ");
    queue.append_text("world!");
    queue.set_emotion("sad");
    queue.append_text("Goodbye, ");
    queue.set_emotion("angry");
    queue.append_text("cruel ");
    queue.append_text("world!");
    queue.finish_current();

    let popped: Vec<String> = std::iter::from_fn(|| queue.pop_next())
        .map(|s| describe(&s))
        .collect();
    assert_eq!(
        popped,
        vec![
            "Sentence(text='Hello, world!', emotion='happy', is_finished=true)",
            "Sentence(text='Goodbye, ', emotion='sad', is_finished=true)",
            "Sentence(text='cruel world!', emotion='angry', is_finished=true)",
        ]
    );
}

#[test]
fn test_consumer_follows_open_sentence() {
    let queue = SentenceQueue::new();
    queue.set_emotion("happy");
    queue.append_text("Part one");

    let live = queue.pop_next().unwrap();
    assert!(live.is_retrieved());
    assert!(!live.is_popped());
    assert!(!live.is_finished());

    queue.append_text(", part two");
    let snapshot = live.snapshot();
    assert_eq!(snapshot.text, "Part one, part two");
    assert!(!snapshot.finished);

    // Still the open sentence, so popping again returns it
    let again = queue.pop_next().unwrap();
    assert_eq!(again.id(), live.id());

    queue.set_emotion("sad");
    assert!(live.is_finished());
    assert!(queue.is_empty());

    queue.append_text("Next.");
    queue.finish_current();
    let next = queue.pop_next().unwrap();
    assert_ne!(next.id(), live.id());
    assert_eq!(next.text(), "Next.");
    assert!(next.is_popped());
}

#[test]
fn test_only_finished_sentences_are_backlogged() {
    let queue = SentenceQueue::new();
    queue.set_emotion("happy");
    queue.append_text("One.");
    queue.set_emotion("sad");
    queue.append_text("Two.");
    assert_eq!(queue.len(), 1);
    assert!(queue.has_open_sentence());

    queue.finish_current();
    assert_eq!(queue.len(), 2);
    assert!(!queue.has_open_sentence());
}

#[test]
fn test_whitespace_only_text_does_not_open_sentence() {
    let queue = SentenceQueue::new();
    queue.append_text(" \n\t");
    queue.finish_current();
    assert!(queue.pop_next().is_none());
}

/// Producers each write complete sentences while one consumer drains the
/// queue, following open sentences until they finish.
#[test]
fn test_concurrent_producers_and_consumer() {
    const PRODUCERS: usize = 4;
    const SENTENCES: usize = 25;
    const WORDS: [&str; 5] = ["alpha ", "beta ", "gamma ", "delta ", "omega"];

    let queue = Arc::new(SentenceQueue::new());
    // The queue has a single open-sentence slot, so each producer's
    // emotion/append/finish sequence is made atomic relative to the others.
    let writer_lock = Arc::new(Mutex::new(()));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            let writer_lock = writer_lock.clone();
            thread::spawn(move || {
                for s in 0..SENTENCES {
                    let _guard = writer_lock.lock();
                    queue.set_emotion(&format!("p{p}"));
                    for word in WORDS {
                        queue.append_text(word);
                        if s % 5 == 0 {
                            thread::yield_now();
                        }
                    }
                    queue.finish_current();
                }
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let mut sentences = Vec::new();
    let expected = PRODUCERS * SENTENCES;
    while sentences.len() < expected {
        let Some(sentence) = queue.pop_next() else {
            thread::sleep(Duration::from_micros(50));
            continue;
        };
        if sentence.is_retrieved() {
            // Follow the open sentence until its producer closes it
            while !sentence.is_finished() {
                thread::yield_now();
            }
        }
        if seen.insert(sentence.id()) {
            sentences.push(sentence);
        }
    }

    for producer in producers {
        producer.join().unwrap();
    }

    assert!(queue.pop_next().is_none());
    assert_eq!(seen.len(), expected);
    for sentence in &sentences {
        assert!(sentence.is_finished());
        assert_eq!(sentence.text(), WORDS.concat());
        assert!(sentence.emotion().is_some_and(|e| e.starts_with('p')));
    }
}

/// Producers call into the queue without coordinating, so their emotion
/// changes and appends interleave at every step. Sentences then mix words
/// from several producers, but no word is lost or duplicated.
#[test]
fn test_uncoordinated_producers_lose_no_text() {
    const PRODUCERS: usize = 4;
    const SENTENCES: usize = 25;
    const WORDS: usize = 5;

    let queue = Arc::new(SentenceQueue::new());
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for s in 0..SENTENCES {
                    queue.set_emotion(&format!("p{p}"));
                    for w in 0..WORDS {
                        queue.append_text(&format!("p{p}s{s}w{w} "));
                        thread::yield_now();
                    }
                    queue.finish_current();
                }
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let mut sentences = Vec::new();
    let mut collect = |sentence: Arc<Sentence>| {
        if sentence.is_retrieved() {
            while !sentence.is_finished() {
                thread::yield_now();
            }
        }
        if seen.insert(sentence.id()) {
            sentences.push(sentence);
        }
    };

    loop {
        if let Some(sentence) = queue.pop_next() {
            collect(sentence);
            continue;
        }
        if producers.iter().all(|p| p.is_finished()) {
            // Every producer ended with finish_current, so only the backlog
            // can still hold sentences.
            while let Some(sentence) = queue.pop_next() {
                collect(sentence);
            }
            break;
        }
        thread::sleep(Duration::from_micros(50));
    }

    for producer in producers {
        producer.join().unwrap();
    }

    assert!(!queue.has_open_sentence());
    assert_eq!(seen.len(), sentences.len());
    assert!(sentences.iter().all(|s| s.is_finished()));

    let mut written: Vec<String> = sentences
        .iter()
        .flat_map(|s| {
            s.text()
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    written.sort();

    let mut expected: Vec<String> = (0..PRODUCERS)
        .flat_map(|p| {
            (0..SENTENCES).flat_map(move |s| (0..WORDS).map(move |w| format!("p{p}s{s}w{w}")))
        })
        .collect();
    expected.sort();

    assert_eq!(written, expected);
}
