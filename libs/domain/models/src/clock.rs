// [libs/domain/models/src/clock.rs]
/*!
 * =================================================================
 * APARATO: TICK CLOCK ORACLE (V4.2 - STATELESS MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: MAPEO AUTORITATIVO TIEMPO MURAL <-> NÚMERO DE TICK
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE ORACLE: Cero estado mutable y cero modos de fallo. El número
 *    de tick es una función pura de (now, inicio, duración) y jamás se
 *    persiste en ningún estrato.
 * 2. SCHEDULER AUTHORITY: Todos los daemons (announcer, refresher,
 *    submitter) colocan sus trabajos en 'next_tick_start' y repiten
 *    cada 'tick_duration'.
 *
 * # Mathematical Proof (Tick Boundary):
 * tick_number(start - epsilon) = 0, tick_number(start) = 1 y
 * tick_number(start + k*dur) = k + 1 para todo k >= 0 entero. La
 * aritmética se realiza en milisegundos para evitar deriva de redondeo.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};

/// Oráculo sin estado del calendario del juego.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    game_starts_at: DateTime<Utc>,
    tick_duration: Duration,
    networks_open_after: Duration,
    game_ends_after: Duration,
}

impl TickClock {
    pub fn new(
        game_starts_at: DateTime<Utc>,
        tick_duration: Duration,
        networks_open_after: Duration,
        game_ends_after: Duration,
    ) -> Self {
        Self {
            game_starts_at,
            tick_duration,
            networks_open_after,
            game_ends_after,
        }
    }

    pub fn first_tick_start(&self) -> DateTime<Utc> {
        self.game_starts_at
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.game_starts_at
    }

    /// Número de tick vigente. 0 antes del arranque del juego.
    pub fn tick_number(&self, now: DateTime<Utc>) -> i64 {
        if !self.has_started(now) {
            return 0;
        }

        let elapsed_ms = (now - self.game_starts_at).num_milliseconds();
        elapsed_ms / self.tick_duration.num_milliseconds() + 1
    }

    /// Tiempo transcurrido dentro del tick vigente.
    pub fn tick_elapsed(&self, now: DateTime<Utc>) -> Duration {
        if !self.has_started(now) {
            return Duration::zero();
        }

        let elapsed_ms = (now - self.game_starts_at).num_milliseconds();
        Duration::milliseconds(elapsed_ms % self.tick_duration.num_milliseconds())
    }

    /// Instante de arranque del siguiente tick. Antes del juego, el
    /// primer tick arranca exactamente en 'game_starts_at'.
    pub fn next_tick_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if !self.has_started(now) {
            return self.game_starts_at;
        }

        now + self.tick_duration - self.tick_elapsed(now)
    }

    pub fn networks_open_at(&self) -> DateTime<Utc> {
        self.game_starts_at + self.networks_open_after
    }

    pub fn game_ends_at(&self) -> DateTime<Utc> {
        self.game_starts_at + self.game_ends_after
    }

    /// Tick en el que se abren las redes entre equipos.
    pub fn network_open_tick(&self) -> i64 {
        self.networks_open_after.num_milliseconds() / self.tick_duration.num_milliseconds()
    }

    /// Volumen total de ticks del juego.
    pub fn game_ends_at_tick(&self) -> i64 {
        self.game_ends_after.num_milliseconds() / self.tick_duration.num_milliseconds()
    }
}
