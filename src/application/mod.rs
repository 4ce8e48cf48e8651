//! Application Layer
//!
//! キャプチャの状態機械、キャンバス合成、領域抽出、再初期化ロジック、
//! 統計管理などのユースケースを実装します。
//!
//! ## モジュール構成
//! - `orchestrator`: キャプチャ制御の状態機械（Uninitialized/Ready/Failed）
//! - `stitcher`: 各出力のフレームを仮想デスクトップへ合成
//! - `extractor`: キャンバスからの矩形抽出と内容検証
//! - `recovery`: 再初期化予算と指数バックオフ
//! - `stats`: 統計情報管理（レイテンシ、リトライ回数、再初期化回数）

pub mod extractor;
pub mod orchestrator;
pub mod recovery;
pub mod stats;
pub mod stitcher;
