//! キャンバス合成モジュール
//!
//! 各出力のStagingBufferを1枚の仮想デスクトップ画像に結合します。

use crate::domain::{Canvas, StagingBuffer, StitchLayout, BYTES_PER_PIXEL};

/// StagingBufferのリストをキャンバスに合成
///
/// レイアウトの違いはキャンバス寸法と配置先オフセットのみで、
/// コピー処理自体は共通。
pub fn stitch(buffers: &[StagingBuffer], layout: StitchLayout) -> Canvas {
    match layout {
        StitchLayout::Concat => stitch_concat(buffers),
        StitchLayout::Desktop => stitch_desktop(buffers),
    }
}

/// 取得順に左から右へ連結（元実装互換）
///
/// キャンバス幅 = 全バッファ幅の合計、高さ = 最大高さ。
/// 出力自身の高さを超える行はゼロのまま残る。
fn stitch_concat(buffers: &[StagingBuffer]) -> Canvas {
    let canvas_width: u32 = buffers.iter().map(|b| b.width).sum();
    let canvas_height: u32 = buffers.iter().map(|b| b.height).max().unwrap_or(0);

    let mut canvas = Canvas::zeroed(canvas_width, canvas_height);
    let canvas_stride = canvas_width as usize * BYTES_PER_PIXEL;

    for y in 0..canvas_height {
        let mut x_offset = 0usize;
        for buffer in buffers {
            let span = buffer.width as usize * BYTES_PER_PIXEL;
            // 高さ不足の行はCanvas::zeroedのゼロ埋めをそのまま使う
            if let Some(row) = buffer.row(y) {
                let dst_start = y as usize * canvas_stride + x_offset * BYTES_PER_PIXEL;
                canvas.data[dst_start..dst_start + span].copy_from_slice(row);
            }
            x_offset += buffer.width as usize;
        }
    }

    canvas
}

/// DXGIが報告するデスクトップ座標で配置
///
/// キャンバスは全出力のバウンディングボックス。列挙順で後の出力が
/// 重なり領域を上書きする。
fn stitch_desktop(buffers: &[StagingBuffer]) -> Canvas {
    if buffers.is_empty() {
        return Canvas::zeroed(0, 0);
    }

    let min_x = buffers.iter().map(|b| b.origin.0).min().unwrap_or(0);
    let min_y = buffers.iter().map(|b| b.origin.1).min().unwrap_or(0);
    let max_x = buffers
        .iter()
        .map(|b| b.origin.0 + b.width as i32)
        .max()
        .unwrap_or(0);
    let max_y = buffers
        .iter()
        .map(|b| b.origin.1 + b.height as i32)
        .max()
        .unwrap_or(0);

    let canvas_width = (max_x - min_x).max(0) as u32;
    let canvas_height = (max_y - min_y).max(0) as u32;

    let mut canvas = Canvas::zeroed(canvas_width, canvas_height);
    let canvas_stride = canvas_width as usize * BYTES_PER_PIXEL;

    for buffer in buffers {
        let dst_x = (buffer.origin.0 - min_x) as usize;
        let dst_y = (buffer.origin.1 - min_y) as usize;
        let span = buffer.width as usize * BYTES_PER_PIXEL;

        for y in 0..buffer.height {
            if let Some(row) = buffer.row(y) {
                let dst_start = (dst_y + y as usize) * canvas_stride + dst_x * BYTES_PER_PIXEL;
                canvas.data[dst_start..dst_start + span].copy_from_slice(row);
            }
        }
    }

    canvas
}
