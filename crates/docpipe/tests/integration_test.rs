#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/pages.rs"]
mod pages;

#[path = "integration/merge.rs"]
mod merge;

#[path = "integration/protect.rs"]
mod protect;

#[path = "integration/images.rs"]
mod images;

#[path = "integration/storage.rs"]
mod storage;

#[path = "integration/dispatch.rs"]
mod dispatch;
