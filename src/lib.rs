//! deskgrab - Library
//!
//! 統合テストおよび外部ツールからプロジェクトの
//! モジュールにアクセスするために提供されています。

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod logging;
