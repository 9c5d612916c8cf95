//! Дрейф-свободный планировщик дискретизации.
//!
//! Дедлайны накапливаются (`deadline += interval`), а не отсчитываются от
//! текущего момента: разовая задержка планирования не сдвигает все
//! последующие моменты выборки, и суммарная ошибка времени остаётся
//! ограниченной. Если потребитель отстал, планировщик навёрстывает пачкой
//! тиков, сохраняя итоговое количество выборок; пропуск дедлайнов для
//! «ресинхронизации» не допускается.

use log::warn;

/// Планировщик с микросекундным разрешением поверх монотонного времени.
#[derive(Debug, Clone)]
pub struct SampleClock {
    interval_us: u64,
    next_deadline_us: u64,
}

/// Результат одного опроса планировщика.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicksDue {
    /// Сколько тиков потребитель должен обработать сейчас
    pub ticks: u32,
    /// Опрос упёрся в предел наверстывания (остаток переносится)
    pub capped: bool,
}

impl SampleClock {
    /// Создаёт планировщик для частоты `rate_hz`; первый дедлайн — `start_us`.
    ///
    /// Частота обязана делить микросекундную сетку нацело (проверяется
    /// конфигурацией до старта).
    pub fn new(
        rate_hz: u16,
        start_us: u64,
    ) -> Self {
        debug_assert!(rate_hz > 0);
        debug_assert_eq!(1_000_000 % rate_hz as u64, 0);

        Self {
            interval_us: 1_000_000 / rate_hz as u64,
            next_deadline_us: start_us,
        }
    }

    /// Период одного тика в микросекундах.
    pub fn interval_us(&self) -> u64 {
        self.interval_us
    }

    /// Ближайший необработанный дедлайн.
    pub fn next_deadline_us(&self) -> u64 {
        self.next_deadline_us
    }

    /// Чистая функция следующего дедлайна: всегда накопление от предыдущего.
    pub fn next_deadline(
        prev_us: u64,
        interval_us: u64,
    ) -> u64 {
        prev_us + interval_us
    }

    /// Количество тиков, созревших к моменту `now_us`, но не больше
    /// `max_catchup`. Каждый учтённый тик продвигает дедлайн на период;
    /// непокрытый остаток остаётся на следующий опрос.
    pub fn ticks_due(
        &mut self,
        now_us: u64,
        max_catchup: u32,
    ) -> TicksDue {
        let mut ticks = 0u32;

        while self.next_deadline_us <= now_us {
            if ticks == max_catchup {
                warn!(
                    "Catch-up burst capped at {max_catchup} ticks, backlog {} us",
                    now_us - self.next_deadline_us
                );
                return TicksDue { ticks, capped: true };
            }

            self.next_deadline_us = Self::next_deadline(self.next_deadline_us, self.interval_us);
            ticks += 1;
        }

        TicksDue {
            ticks,
            capped: false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
