//! Буферизированная запись с фиксированной ёмкостью.
//!
//! Буфер — арена фиксированного размера со счётчиком заполнения, без
//! динамического роста: константная память гарантируется на весь срок
//! сессии. Потеря одной записи предпочтительнее потери всей сессии, поэтому
//! ошибки записи здесь никогда не останавливают захват — они учитываются в
//! статистике и всплывают позже при верификации размера файла.

use std::io::Write;

use log::{error, warn};

/// Результат одного сброса буфера в хранилище.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Все байты приняты хранилищем
    Clean,
    /// Буфер был пуст, записи не было
    Empty,
    /// Хранилище приняло меньше байт, чем запрошено (recoverable)
    Short { written: usize, requested: usize },
    /// Нулевая запись или ошибка ввода/вывода (hard storage error)
    Failed,
}

/// Счётчики записи (для прогресса и итоговой сводки).
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteStats {
    pub flushes: u64,
    pub short_writes: u64,
    pub failed_writes: u64,
    pub bytes_written: u64,
}

/// Писатель с фиксированным буфером и авто-flush ровно при достижении
/// ёмкости.
pub struct BufferedWriter<W: Write> {
    inner: W,
    buf: Box<[u8]>,
    len: usize,
    stats: WriteStats,
}

impl<W: Write> BufferedWriter<W> {
    /// Создаёт писатель с буфером ёмкостью `capacity` байт.
    pub fn new(
        inner: W,
        capacity: usize,
    ) -> Self {
        assert!(capacity > 0, "buffer capacity must be non-zero");

        Self {
            inner,
            buf: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            stats: WriteStats::default(),
        }
    }

    /// Копирует `bytes` в буфер; при достижении ёмкости выполняется
    /// неявный [`flush`](Self::flush). Никогда не завершается ошибкой —
    /// сбои хранилища учитываются и запись продолжается.
    pub fn append(
        &mut self,
        bytes: &[u8],
    ) {
        let mut rest = bytes;

        while !rest.is_empty() {
            let room = self.buf.len() - self.len;
            let take = room.min(rest.len());

            self.buf[self.len..self.len + take].copy_from_slice(&rest[..take]);
            self.len += take;
            rest = &rest[take..];

            if self.len == self.buf.len() {
                self.flush();
            }
        }
    }

    /// Сбрасывает текущее содержимое буфера в хранилище и обнуляет
    /// заполнение. Короткая запись — предупреждение; нулевая запись или
    /// ошибка I/O — hard error, но захват не прерывается.
    pub fn flush(&mut self) -> FlushStatus {
        if self.len == 0 {
            return FlushStatus::Empty;
        }

        let requested = self.len;
        let status = match self.inner.write(&self.buf[..requested]) {
            Ok(0) => {
                error!("Storage write failed: 0/{requested} bytes accepted");
                self.stats.failed_writes += 1;
                FlushStatus::Failed
            }
            Ok(written) if written < requested => {
                warn!("Short write: {written}/{requested} bytes");
                self.stats.short_writes += 1;
                self.stats.bytes_written += written as u64;
                FlushStatus::Short { written, requested }
            }
            Ok(written) => {
                self.stats.bytes_written += written as u64;
                FlushStatus::Clean
            }
            Err(e) => {
                error!("Storage write error: {e}");
                self.stats.failed_writes += 1;
                FlushStatus::Failed
            }
        };

        // Заполнение сбрасывается в любом случае: расхождение всплывёт при
        // верификации размера на финализации
        self.len = 0;
        self.stats.flushes += 1;
        status
    }

    /// Текущее заполнение буфера в байтах.
    pub fn fill(&self) -> usize {
        self.len
    }

    /// Ёмкость буфера в байтах.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Накопленные счётчики записи.
    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    /// Сбрасывает остаток и возвращает внутренний writer.
    pub fn into_inner(mut self) -> (W, WriteStats) {
        self.flush();
        (self.inner, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use super::*;

    /// Writer, принимающий не более `limit` байт за один вызов write.
    struct ShortWriter {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_auto_flush_at_exact_capacity() {
        // 4 записи по 6 байт ровно заполняют буфер в 24 байта
        let mut w = BufferedWriter::new(Vec::new(), 24);

        for _ in 0..4 {
            w.append(&[0xAB; 6]);
        }

        assert_eq!(w.stats().flushes, 1, "ровно один авто-flush");
        assert_eq!(w.fill(), 0, "после flush заполнение нулевое");
        assert_eq!(w.stats().bytes_written, 24);
    }

    #[test]
    fn test_no_flush_below_capacity() {
        let mut w = BufferedWriter::new(Vec::new(), 24);

        w.append(&[1; 6]);
        w.append(&[2; 6]);

        assert_eq!(w.stats().flushes, 0);
        assert_eq!(w.fill(), 12);
    }

    #[test]
    fn test_append_larger_than_capacity() {
        let mut w = BufferedWriter::new(Vec::new(), 8);

        w.append(&[7; 20]);

        // 8 + 8 = два авто-flush, 4 байта остаются в буфере
        assert_eq!(w.stats().flushes, 2);
        assert_eq!(w.fill(), 4);

        let (inner, stats) = w.into_inner();
        assert_eq!(inner.len(), 20);
        assert_eq!(stats.bytes_written, 20);
    }

    #[test]
    fn test_explicit_flush_resets_fill() {
        let mut w = BufferedWriter::new(Vec::new(), 64);

        w.append(&[1, 2, 3]);
        assert_eq!(w.flush(), FlushStatus::Clean);
        assert_eq!(w.fill(), 0);
        assert_eq!(w.flush(), FlushStatus::Empty, "пустой буфер — без записи");
    }

    #[test]
    fn test_short_write_reported_not_fatal() {
        let inner = ShortWriter {
            data: Vec::new(),
            limit: 4,
        };
        let mut w = BufferedWriter::new(inner, 16);

        w.append(&[9; 10]);
        let status = w.flush();

        assert_eq!(
            status,
            FlushStatus::Short {
                written: 4,
                requested: 10
            }
        );
        assert_eq!(w.stats().short_writes, 1);
        // Запись продолжается: новый append не паникует и учитывается
        w.append(&[1; 3]);
        assert_eq!(w.fill(), 3);
    }

    #[test]
    fn test_zero_write_is_hard_error_but_not_fatal() {
        let mut w = BufferedWriter::new(FailingWriter, 16);

        w.append(&[5; 8]);
        assert_eq!(w.flush(), FlushStatus::Failed);
        assert_eq!(w.stats().failed_writes, 1);
        assert_eq!(w.fill(), 0, "заполнение сброшено несмотря на сбой");
    }
}
