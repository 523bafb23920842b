//! Per-tick systems, run in a fixed order by the simulation.
//!
//! Entities that die during a pass are collected and despawned after it, so
//! no query is ever mutated while being walked.

use combat::{AttackOutcome, CombatResolver, DamageOutcome, Enemy, EnemyContext};
use hecs::{Entity, World};
use hero::ROTATE_STEP;
use items::{Bullet, Owner, Potion};
use tracing::{debug, info};

use crate::audio::SoundEffect;
use crate::ecs::Resources;

pub enum SystemResult {
    Continue,
    /// Skip the rest of the pipeline for this tick
    Stop,
    /// This system gave up; the others still run
    Error(String),
}

pub trait System: Send {
    fn name(&self) -> &str;
    fn run(&mut self, world: &mut World, resources: &mut Resources) -> SystemResult;
}

/// The standard tick pipeline
pub fn default_systems() -> Vec<Box<dyn System>> {
    vec![
        Box::new(PlayerInputSystem),
        Box::new(PlayerTimerSystem),
        Box::new(EnemyAISystem),
        Box::new(BulletSystem),
        Box::new(PickupSystem),
        Box::new(DeathSystem),
    ]
}

/// 转向、移动、喝药、开火。
///
/// A dead player freezes the tick. A player standing inside a wall is a
/// broken level and is reported instead of acted on.
pub struct PlayerInputSystem;

impl System for PlayerInputSystem {
    fn name(&self) -> &str {
        "PlayerInputSystem"
    }

    fn run(&mut self, world: &mut World, resources: &mut Resources) -> SystemResult {
        let Resources {
            grid,
            player,
            rng,
            screen,
            input,
            events,
            ..
        } = resources;

        if player.is_dead() {
            return SystemResult::Stop;
        }
        if grid.is_wall(player.x, player.y) {
            return SystemResult::Error(format!(
                "player at ({:.2}, {:.2}) is inside a wall",
                player.x, player.y
            ));
        }

        let turn = input.turn_axis();
        if turn != 0.0 {
            player.rotate(turn * ROTATE_STEP);
        }
        player.walk(input.forward_axis(), input.strafe_axis(), grid);

        if input.use_potion {
            if let Some(healed) = player.use_potion(rng) {
                debug!(healed, hp = player.hp, "potion used");
                events.healed = Some(healed);
                events.sound(SoundEffect::PotionUse);
            }
        }

        if let Some(aim) = input.fire {
            if let Some(bullet) = player.shoot(aim, *screen, grid) {
                world.spawn((bullet,));
                events.shots_fired += 1;
                events.sound(SoundEffect::Shoot);
            }
        }

        SystemResult::Continue
    }
}

/// 冷却与枪口闪光倒计时
pub struct PlayerTimerSystem;

impl System for PlayerTimerSystem {
    fn name(&self) -> &str {
        "PlayerTimerSystem"
    }

    fn run(&mut self, _world: &mut World, resources: &mut Resources) -> SystemResult {
        resources.player.update();
        SystemResult::Continue
    }
}

/// Enemies update one after another; each sees where the earlier ones moved.
pub struct EnemyAISystem;

impl System for EnemyAISystem {
    fn name(&self) -> &str {
        "EnemyAISystem"
    }

    fn run(&mut self, world: &mut World, resources: &mut Resources) -> SystemResult {
        let ids: Vec<Entity> = world.query::<&Enemy>().iter().map(|(id, _)| id).collect();
        let player = (resources.player.x, resources.player.y);

        for id in ids {
            let others: Vec<(f32, f32)> = world
                .query::<&Enemy>()
                .iter()
                .filter(|(other, e)| *other != id && e.is_targetable())
                .map(|(_, e)| (e.x, e.y))
                .collect();
            let ctx = EnemyContext {
                player,
                grid: &resources.grid,
                others: &others,
                pursue_out_of_sight: resources.pursue_out_of_sight,
            };

            let fired = {
                let Ok(mut enemy) = world.get::<&mut Enemy>(id) else {
                    continue;
                };
                enemy
                    .update(&ctx)
                    .map(|shot| (shot, Owner::Enemy(enemy.kind, enemy.level)))
            };

            if let Some((shot, owner)) = fired {
                world.spawn((Bullet::new(shot.x, shot.y, shot.z, shot.angle, 0.0, owner),));
                resources.events.enemy_shots += 1;
                resources.events.sound(SoundEffect::EnemyShoot);
            }
        }

        SystemResult::Continue
    }
}

/// Moves bullets and resolves whatever they run into
pub struct BulletSystem;

impl System for BulletSystem {
    fn name(&self) -> &str {
        "BulletSystem"
    }

    fn run(&mut self, world: &mut World, resources: &mut Resources) -> SystemResult {
        let ids: Vec<Entity> = world.query::<&Bullet>().iter().map(|(id, _)| id).collect();
        let mut spent = Vec::new();

        for id in ids {
            let bullet = {
                let Ok(mut bullet) = world.get::<&mut Bullet>(id) else {
                    continue;
                };
                if !bullet.advance(&resources.grid) {
                    spent.push(id);
                    continue;
                }
                *bullet
            };

            let consumed = match bullet.owner {
                Owner::Player => player_bullet_hit(world, resources, &bullet),
                Owner::Enemy(kind, level) => {
                    let player = &mut resources.player;
                    if player.is_dead() || !bullet.hits(player.x, player.y) {
                        false
                    } else {
                        let shooter = kind.shooter(level);
                        let outcome =
                            CombatResolver::resolve_attack(&shooter, &*player, &mut resources.rng);
                        if let AttackOutcome::Hit { damage } = outcome {
                            player.take_damage(damage);
                            resources.events.damage_taken += damage;
                            resources.events.sound(SoundEffect::Hit);
                            debug!(%kind, damage, hp = player.hp, "player hit");
                        }
                        true
                    }
                }
            };
            if consumed {
                spent.push(id);
            }
        }

        for id in spent {
            let _ = world.despawn(id);
        }
        SystemResult::Continue
    }
}

/// Resolve a player bullet against the first enemy it overlaps. The bullet
/// is spent on contact, hit or miss.
fn player_bullet_hit(world: &mut World, resources: &mut Resources, bullet: &Bullet) -> bool {
    let target = world
        .query::<&Enemy>()
        .iter()
        .find(|(_, e)| e.is_targetable() && bullet.hits(e.x, e.y))
        .map(|(id, _)| id);
    let Some(target) = target else {
        return false;
    };
    let Ok(mut enemy) = world.get::<&mut Enemy>(target) else {
        return false;
    };

    let outcome = CombatResolver::resolve_attack(&resources.player, &*enemy, &mut resources.rng);
    let AttackOutcome::Hit { damage } = outcome else {
        return true;
    };

    let events = &mut resources.events;
    events.enemies_hit += 1;
    events.sound(SoundEffect::Hit);
    if enemy.take_damage(damage) == DamageOutcome::Killed {
        resources.kills += 1;
        events.enemies_killed += 1;
        events.xp_gained += enemy.xp_value;
        let levels = resources.player.gain_xp(enemy.xp_value);
        events.levels_gained += levels;
        info!(kind = %enemy.kind, xp = enemy.xp_value, kills = resources.kills, "enemy killed");
    }
    true
}

/// 拾取药水：只加库存，不回血
pub struct PickupSystem;

impl System for PickupSystem {
    fn name(&self) -> &str {
        "PickupSystem"
    }

    fn run(&mut self, world: &mut World, resources: &mut Resources) -> SystemResult {
        let player = &mut resources.player;
        let picked: Vec<Entity> = world
            .query::<&Potion>()
            .iter()
            .filter(|(_, p)| p.in_pickup_range(player.x, player.y))
            .map(|(id, _)| id)
            .collect();

        for id in picked {
            if let Ok(potion) = world.remove_one::<Potion>(id) {
                let _ = world.despawn(id);
                player.potions += 1;
                debug!(heal_amount = potion.heal_amount, potions = player.potions, "potion picked up");
                resources.events.potions_picked += 1;
                resources.events.sound(SoundEffect::PotionPickup);
            }
        }
        SystemResult::Continue
    }
}

/// Counts down dying enemies and removes them when the animation ends
pub struct DeathSystem;

impl System for DeathSystem {
    fn name(&self) -> &str {
        "DeathSystem"
    }

    fn run(&mut self, world: &mut World, _resources: &mut Resources) -> SystemResult {
        let finished: Vec<Entity> = world
            .query_mut::<&mut Enemy>()
            .into_iter()
            .filter_map(|(id, enemy)| enemy.tick_death().then_some(id))
            .collect();
        for id in finished {
            let _ = world.despawn(id);
        }
        SystemResult::Continue
    }
}
