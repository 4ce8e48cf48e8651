/// モックキャプチャソース
///
/// テスト・非Windows環境向けのDuplicationSource実装。
/// 出力構成と障害シナリオ（初期化失敗・取得失敗・ブランクフレーム）を
/// 注入でき、状態機械の検証に使う。

use crate::domain::{
    AcquireError, CaptureError, CaptureResult, DuplicationSource, StagingBuffer, BYTES_PER_PIXEL,
};

/// モック出力1枚分の構成
#[derive(Debug, Clone)]
pub struct MockOutput {
    pub width: u32,
    pub height: u32,
    /// 全ピクセルに敷き詰めるBGRA値
    pub fill: [u8; 4],
    /// デスクトップ座標上の左上
    pub origin: (i32, i32),
}

impl MockOutput {
    pub fn new(width: u32, height: u32, fill: [u8; 4]) -> Self {
        Self {
            width,
            height,
            fill,
            origin: (0, 0),
        }
    }

    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    fn to_buffer(&self, blank: bool) -> StagingBuffer {
        let len = self.width as usize * self.height as usize * BYTES_PER_PIXEL;
        let data = if blank {
            vec![0u8; len]
        } else {
            let mut data = Vec::with_capacity(len);
            for _ in 0..len / BYTES_PER_PIXEL {
                data.extend_from_slice(&self.fill);
            }
            data
        };
        StagingBuffer::new(data, self.width, self.height).with_origin(self.origin.0, self.origin.1)
    }
}

/// モックキャプチャソース
pub struct MockDuplicationSource {
    outputs: Vec<MockOutput>,
    /// 先頭から消費される初期化失敗の残数
    init_failures_remaining: u32,
    /// 初期化成功後、先頭から消費される取得失敗の残数
    acquire_failures_remaining: u32,
    /// 取得失敗の後に消費されるNoNewFrameの残数
    idle_frames_remaining: u32,
    /// さらにその後に消費される全ゼロフレームの残数
    blank_frames_remaining: u32,
    initialized: bool,
    init_count: u32,
    acquire_count: u32,
    teardown_count: u32,
}

impl MockDuplicationSource {
    /// 指定した出力構成のモックソースを作成（障害なし）
    pub fn new(outputs: Vec<MockOutput>) -> Self {
        Self {
            outputs,
            init_failures_remaining: 0,
            acquire_failures_remaining: 0,
            idle_frames_remaining: 0,
            blank_frames_remaining: 0,
            initialized: false,
            init_count: 0,
            acquire_count: 0,
            teardown_count: 0,
        }
    }

    /// 1920x1080単一出力のモックソース（簡易テスト用）
    pub fn single_output() -> Self {
        Self::new(vec![MockOutput::new(1920, 1080, [0x10, 0x20, 0x30, 0xFF])])
    }

    /// 最初のn回の初期化を失敗させる
    pub fn fail_first_inits(mut self, n: u32) -> Self {
        self.init_failures_remaining = n;
        self
    }

    /// 初期化成功後、最初のn回の取得を失敗させる
    pub fn fail_first_acquires(mut self, n: u32) -> Self {
        self.acquire_failures_remaining = n;
        self
    }

    /// 最初のn回の取得でNoNewFrameを返す
    pub fn idle_first_frames(mut self, n: u32) -> Self {
        self.idle_frames_remaining = n;
        self
    }

    /// 最初のn枚のフレームを全ゼロにする
    pub fn blank_first_frames(mut self, n: u32) -> Self {
        self.blank_frames_remaining = n;
        self
    }

    pub fn init_count(&self) -> u32 {
        self.init_count
    }

    pub fn acquire_count(&self) -> u32 {
        self.acquire_count
    }

    pub fn teardown_count(&self) -> u32 {
        self.teardown_count
    }
}

impl DuplicationSource for MockDuplicationSource {
    fn initialize(&mut self) -> CaptureResult<()> {
        self.init_count += 1;
        if self.init_failures_remaining > 0 {
            self.init_failures_remaining -= 1;
            return Err(CaptureError::Initialization(
                "mock initialization failure".to_string(),
            ));
        }
        if self.outputs.is_empty() {
            return Err(CaptureError::NoOutputs);
        }
        self.initialized = true;
        Ok(())
    }

    fn acquire_all(&mut self) -> Result<Vec<StagingBuffer>, AcquireError> {
        self.acquire_count += 1;
        if !self.initialized {
            return Err(AcquireError::Failed("mock session not initialized".into()));
        }
        if self.acquire_failures_remaining > 0 {
            self.acquire_failures_remaining -= 1;
            return Err(AcquireError::Failed("mock acquisition failure".into()));
        }
        if self.idle_frames_remaining > 0 {
            self.idle_frames_remaining -= 1;
            return Err(AcquireError::NoNewFrame);
        }

        let blank = if self.blank_frames_remaining > 0 {
            self.blank_frames_remaining -= 1;
            true
        } else {
            false
        };

        Ok(self.outputs.iter().map(|o| o.to_buffer(blank)).collect())
    }

    fn teardown(&mut self) {
        if self.initialized {
            self.teardown_count += 1;
        }
        self.initialized = false;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
