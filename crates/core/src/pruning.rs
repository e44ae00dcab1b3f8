//! Emptiness rules.
//!
//! An answer is empty iff it has no value and no non-empty child item. An item is empty iff
//! it has no non-empty answer and no non-empty child item. The walker drops empty nodes before
//! descending into them.

use crate::answers::{Answer, Item};
use crate::dispatcher::Dispatcher;

pub fn is_empty_answer(dispatcher: &Dispatcher, answer: &Answer) -> bool {
    !dispatcher.has_value(answer) && answer.items.iter().all(|i| is_empty_item(dispatcher, i))
}

pub fn is_empty_item(dispatcher: &Dispatcher, item: &Item) -> bool {
    item.answers
        .iter()
        .all(|a| is_empty_answer(dispatcher, a))
        && item.items.iter().all(|i| is_empty_item(dispatcher, i))
}
