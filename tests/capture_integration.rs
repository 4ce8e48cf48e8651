//! キャプチャパイプライン統合テスト
//!
//! モックソースでセッション確立 → 取得 → 合成 → 抽出の全経路を検証する。
//! GPU不要でどの環境でも実行できる。

use std::time::Duration;

use deskgrab::application::orchestrator::{CaptureOrchestrator, SessionState};
use deskgrab::application::recovery::{RecoveryPolicy, RecoveryState};
use deskgrab::domain::{CaptureError, Region, StitchLayout, BYTES_PER_PIXEL};
use deskgrab::infrastructure::bmp::write_bmp;
use deskgrab::infrastructure::mock_source::{MockDuplicationSource, MockOutput};

/// 待機なしのテスト用ポリシー
fn fast_policy() -> RecoveryPolicy {
    RecoveryPolicy {
        max_reinit_attempts: 3,
        max_blank_retries: 5,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
        teardown_on_idle: true,
    }
}

fn orchestrator(
    source: MockDuplicationSource,
    layout: StitchLayout,
) -> CaptureOrchestrator<MockDuplicationSource> {
    CaptureOrchestrator::new(source, layout, RecoveryState::new(fast_policy()))
}

const RED: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];
const BLUE: [u8; 4] = [0xFF, 0x00, 0x00, 0xFF];

/// 800x600と400x900の2出力構成（連結キャンバスは1200x900）
fn two_output_source() -> MockDuplicationSource {
    MockDuplicationSource::new(vec![
        MockOutput::new(800, 600, RED),
        MockOutput::new(400, 900, BLUE),
    ])
}

#[test]
fn test_two_output_concat_capture() {
    let mut orch = orchestrator(two_output_source(), StitchLayout::Concat);

    let mut region = Region::new(0, 0, 1200, 900);
    let mut pixels = vec![0u8; region.byte_len()];
    let len = orch.capture(&mut region, &mut pixels).expect("capture");

    assert_eq!(len, 1200 * 900 * BYTES_PER_PIXEL);
    assert_eq!(orch.state(), SessionState::Ready);

    let row_stride = 1200 * BYTES_PER_PIXEL;
    // 行0: x=0は出力A（赤）、x=800は出力B（青）
    assert_eq!(&pixels[0..4], &RED);
    assert_eq!(&pixels[800 * BYTES_PER_PIXEL..800 * BYTES_PER_PIXEL + 4], &BLUE);
    // 行700: 出力Aの高さ600を超えた領域はゼロ、出力Bは青のまま
    let row700 = 700 * row_stride;
    assert_eq!(&pixels[row700..row700 + 4], &[0, 0, 0, 0]);
    assert_eq!(
        &pixels[row700 + 800 * BYTES_PER_PIXEL..row700 + 800 * BYTES_PER_PIXEL + 4],
        &BLUE
    );
}

#[test]
fn test_desktop_layout_places_outputs_by_origin() {
    // 縦積み構成: Bは(0,600)に配置される
    let source = MockDuplicationSource::new(vec![
        MockOutput::new(800, 600, RED).with_origin(0, 0),
        MockOutput::new(800, 600, BLUE).with_origin(0, 600),
    ]);
    let mut orch = orchestrator(source, StitchLayout::Desktop);

    let mut region = Region::new(0, 0, 800, 1200);
    let mut pixels = vec![0u8; region.byte_len()];
    let len = orch.capture(&mut region, &mut pixels).expect("capture");

    assert_eq!(len, 800 * 1200 * BYTES_PER_PIXEL);
    assert_eq!(&pixels[0..4], &RED);
    let row600 = 600 * 800 * BYTES_PER_PIXEL;
    assert_eq!(&pixels[row600..row600 + 4], &BLUE);
}

#[test]
fn test_region_is_clamped_in_place() {
    let mut orch = orchestrator(two_output_source(), StitchLayout::Concat);

    // 左上にはみ出した矩形はキャンバス原点へクランプされる
    let mut region = Region::new(-50, -50, 100, 100);
    let mut pixels = vec![0u8; region.byte_len()];
    let len = orch.capture(&mut region, &mut pixels).expect("capture");

    assert_eq!(region, Region::new(0, 0, 100, 100));
    assert_eq!(len, 100 * 100 * BYTES_PER_PIXEL);
    assert_eq!(&pixels[0..4], &RED);
}

#[test]
fn test_region_outside_canvas_is_rejected() {
    let mut orch = orchestrator(two_output_source(), StitchLayout::Concat);

    let mut region = Region::new(1300, 0, 1400, 100);
    let mut pixels = vec![0u8; region.byte_len()];
    let err = orch.capture(&mut region, &mut pixels).unwrap_err();

    assert!(matches!(err, CaptureError::RegionOutOfBounds));
    // 却下時は矩形を書き換えない
    assert_eq!(region, Region::new(1300, 0, 1400, 100));
}

#[test]
fn test_blank_frames_converge_without_reinit() {
    let source = two_output_source().blank_first_frames(2);
    let mut orch = orchestrator(source, StitchLayout::Concat);

    let mut region = Region::new(0, 0, 100, 100);
    let mut pixels = vec![0u8; region.byte_len()];
    let len = orch.capture(&mut region, &mut pixels).expect("capture");

    assert_eq!(len, 100 * 100 * BYTES_PER_PIXEL);
    assert_eq!(&pixels[0..4], &RED);
    // ブランク2枚はセッションを維持したまま再取得で乗り切ること
    assert_eq!(orch.stats().reinit_count(), 1);
}

#[test]
fn test_acquisition_failure_rebuilds_session() {
    let source = two_output_source().fail_first_acquires(1);
    let mut orch = orchestrator(source, StitchLayout::Concat);

    let mut region = Region::new(0, 0, 100, 100);
    let mut pixels = vec![0u8; region.byte_len()];
    orch.capture(&mut region, &mut pixels).expect("capture");

    // 取得失敗でセッションが作り直されたこと
    assert_eq!(orch.stats().reinit_count(), 2);
    assert_eq!(orch.state(), SessionState::Ready);
}

#[test]
fn test_init_failure_budget_then_recovery() {
    // 予算3回を全て失敗で使い切らせる
    let source = two_output_source().fail_first_inits(3);
    let mut orch = orchestrator(source, StitchLayout::Concat);

    let mut region = Region::new(0, 0, 100, 100);
    let mut pixels = vec![0u8; region.byte_len()];
    let err = orch.capture(&mut region, &mut pixels).unwrap_err();
    assert!(matches!(err, CaptureError::Initialization(_)));
    assert_eq!(orch.state(), SessionState::Failed);

    // 次の呼び出しでは予算がリセットされ、回復できる
    let mut region = Region::new(0, 0, 100, 100);
    let len = orch.capture(&mut region, &mut pixels).expect("recovered");
    assert_eq!(len, 100 * 100 * BYTES_PER_PIXEL);
    assert_eq!(orch.state(), SessionState::Ready);
}

#[test]
fn test_capture_to_bmp_end_to_end() {
    let mut orch = orchestrator(two_output_source(), StitchLayout::Concat);

    let mut region = Region::new(0, 0, 64, 48);
    let mut pixels = vec![0u8; region.byte_len()];
    let len = orch.capture(&mut region, &mut pixels).expect("capture");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.bmp");
    write_bmp(&path, &pixels[..len], region.width() as u32, region.height() as u32)
        .expect("write bmp");

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..2], b"BM");
    assert_eq!(bytes.len(), 54 + len);
    // ピクセルデータは抽出結果そのまま
    assert_eq!(&bytes[54..58], &RED);
}
