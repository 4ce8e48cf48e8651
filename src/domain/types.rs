/// コア型定義
///
/// Domain層の中心となるデータ構造。
/// キャプチャパイプライン全体で共有される型。

/// 1ピクセルあたりのバイト数（B8G8R8A8）
pub const BYTES_PER_PIXEL: usize = 4;

/// 呼び出し側が指定する抽出矩形（キャンバス座標系）
///
/// スクリーン座標は負になり得るため各辺はi32。
/// 抽出時にキャンバス範囲へインプレースでクランプされ、
/// クランプ後の値を呼び出し側が結果バッファの寸法解釈に使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    /// 新しいRegionを作成
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// 矩形の幅（ピクセル）
    ///
    /// クランプ前に呼ぶと負になり得るため0でサチュレートする。
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    /// 矩形の高さ（ピクセル）
    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    /// 矩形が占めるバイト数（4バイト/ピクセル）
    pub fn byte_len(&self) -> usize {
        self.width() as usize * self.height() as usize * BYTES_PER_PIXEL
    }

    /// 指定サイズのキャンバスと重なりを持つか判定
    ///
    /// 完全にキャンバス外の矩形はクランプしても空になるため、
    /// 抽出前にこの判定で弾く。
    pub fn overlaps_canvas(&self, canvas_width: u32, canvas_height: u32) -> bool {
        self.left < canvas_width as i32
            && self.top < canvas_height as i32
            && self.right > 0
            && self.bottom > 0
    }

    /// キャンバス範囲 [0, width] × [0, height] へインプレースでクランプ
    pub fn clamp_to_canvas(&mut self, canvas_width: u32, canvas_height: u32) {
        self.right = self.right.min(canvas_width as i32);
        self.bottom = self.bottom.min(canvas_height as i32);
        self.left = self.left.max(0);
        self.top = self.top.max(0);
    }
}

/// 1出力分のCPU可読フレームコピー
///
/// 毎サイクル新規に作られる短命バッファ。dataは行パディングなしの
/// 連続メモリ（width * 4 バイト/行）。originはDXGIが報告する
/// デスクトップ座標上の左上位置で、desktopレイアウトでのみ使用される。
#[derive(Debug, Clone)]
pub struct StagingBuffer {
    /// ピクセルデータ（B8G8R8A8、連続メモリ）
    pub data: Vec<u8>,
    /// 画像の幅
    pub width: u32,
    /// 画像の高さ
    pub height: u32,
    /// デスクトップ座標上の出力左上位置 (x, y)
    pub origin: (i32, i32),
}

impl StagingBuffer {
    /// 新しいStagingBufferを作成
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            origin: (0, 0),
        }
    }

    /// デスクトップ座標を付与
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    /// 行yのピクセルデータを取得
    ///
    /// yが高さを超える場合はNone。
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let start = y as usize * stride;
        Some(&self.data[start..start + stride])
    }
}

/// 全出力を結合した仮想デスクトップ画像
///
/// 1サイクル内で生成・消費される。
#[derive(Debug, Clone)]
pub struct Canvas {
    /// ピクセルデータ（B8G8R8A8、連続メモリ）
    pub data: Vec<u8>,
    /// キャンバス幅
    pub width: u32,
    /// キャンバス高さ
    pub height: u32,
}

impl Canvas {
    /// ゼロ初期化済みのキャンバスを作成
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL],
            width,
            height,
        }
    }

    /// (x, y) のピクセル4バイトを取得（テスト・検証用）
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some(&self.data[offset..offset + BYTES_PER_PIXEL])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_dimensions() {
        let region = Region::new(10, 20, 110, 220);
        assert_eq!(region.width(), 100);
        assert_eq!(region.height(), 200);
        assert_eq!(region.byte_len(), 100 * 200 * 4);
    }

    #[test]
    fn test_region_negative_extent_saturates() {
        let region = Region::new(100, 100, 50, 50);
        assert_eq!(region.width(), 0);
        assert_eq!(region.height(), 0);
        assert_eq!(region.byte_len(), 0);
    }

    #[test]
    fn test_region_overlap() {
        let inside = Region::new(-50, -50, 100, 100);
        assert!(inside.overlaps_canvas(1200, 900));

        // 右側に完全にはみ出し
        let right_of = Region::new(1210, 0, 1300, 100);
        assert!(!right_of.overlaps_canvas(1200, 900));

        // 完全に負領域（right <= 0）
        let negative = Region::new(-200, -200, -100, -100);
        assert!(!negative.overlaps_canvas(1200, 900));
    }

    #[test]
    fn test_region_clamp() {
        let mut region = Region::new(-50, -50, 100, 100);
        region.clamp_to_canvas(1200, 900);
        assert_eq!(region, Region::new(0, 0, 100, 100));
    }

    #[test]
    fn test_region_clamp_idempotent() {
        let mut region = Region::new(-50, 30, 5000, 5000);
        region.clamp_to_canvas(1200, 900);
        let once = region;
        region.clamp_to_canvas(1200, 900);
        assert_eq!(region, once);
    }

    #[test]
    fn test_staging_buffer_row() {
        let data: Vec<u8> = (0u8..32).collect();
        let buf = StagingBuffer::new(data, 2, 4);

        let row1 = buf.row(1).unwrap();
        assert_eq!(row1, &[8, 9, 10, 11, 12, 13, 14, 15]);
        assert!(buf.row(4).is_none());
    }

    #[test]
    fn test_canvas_pixel() {
        let mut canvas = Canvas::zeroed(4, 4);
        canvas.data[(2 * 4 + 3) * 4] = 0xFF;

        assert_eq!(canvas.pixel(3, 2).unwrap()[0], 0xFF);
        assert!(canvas.pixel(4, 0).is_none());
    }
}
