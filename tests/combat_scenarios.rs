use combat::enemy::{DEATH_TICKS, SHOOT_THRESHOLD};
use combat::{DamageOutcome, Enemy, EnemyKind, Progression};
use dungeon::{GridMap, Room};
use hero::Player;
use items::{Bullet, Owner, Potion};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use terminal_raycast_dungeon::audio::{RecordingAudio, SoundEffect};
use terminal_raycast_dungeon::ecs::ECSWorld;
use terminal_raycast_dungeon::game_loop::{LevelOutcome, Simulation};
use terminal_raycast_dungeon::input::InputSnapshot;

fn hall() -> GridMap {
    let mut grid = GridMap::new(16, 8);
    grid.try_add_room(Room::new(1, 1, 14, 6));
    grid
}

fn idle() -> InputSnapshot {
    InputSnapshot::default()
}

#[test]
fn one_hp_enemy_dies_from_five_damage() {
    let mut enemy = Enemy::new(5.0, 5.0, EnemyKind::Orc);
    enemy.hp = 1;

    assert_eq!(enemy.take_damage(5), DamageOutcome::Killed);
    assert_eq!(enemy.hp, 0);
    assert_eq!(enemy.death_countdown(), Some(DEATH_TICKS));
    assert!(!enemy.is_targetable());
    // 死亡动画期间不再受伤
    assert_eq!(enemy.take_damage(5), DamageOutcome::AlreadyDead);
}

#[test]
fn two_hundred_fifty_xp_gives_two_levels() {
    let mut progression = Progression::default();
    assert_eq!(progression.grant(250), 2);
    assert_eq!(progression.level, 3);
    assert_eq!(progression.xp, 0);
    assert_eq!(progression.xp_to_next_level, 225);

    let mut player = Player::new(1.5, 1.5);
    player.hp = 10;
    assert_eq!(player.gain_xp(250), 2);
    assert_eq!(player.max_hp, 300);
    assert_eq!(player.hp, 300);
}

#[test]
fn dying_enemy_is_skipped_by_bullets_then_removed() {
    let mut ecs = ECSWorld::new(hall(), Player::new(2.5, 4.5), 1, 5);
    let mut corpse = Enemy::new(2.9, 4.5, EnemyKind::Goblin);
    corpse.take_damage(10_000);
    ecs.world.spawn((corpse,));
    ecs.world
        .spawn((Bullet::new(2.5, 4.5, 1.0, 0.0, 0.0, Owner::Player),));

    let mut sim = Simulation::new(ecs);
    let events = sim.tick(&idle(), &mut RecordingAudio::default());
    assert_eq!(events.enemies_hit, 0);
    assert_eq!(sim.ecs.bullet_count(), 1);
    assert_eq!(sim.outcome(), LevelOutcome::InProgress);

    for _ in 0..DEATH_TICKS {
        sim.tick(&idle(), &mut RecordingAudio::default());
    }
    assert_eq!(sim.ecs.enemy_count(), 0);
    assert_eq!(sim.outcome(), LevelOutcome::Cleared);
}

#[test]
fn walking_onto_a_potion_picks_it_up() {
    let mut rng = Pcg32::seed_from_u64(2);
    let mut ecs = ECSWorld::new(hall(), Player::new(2.5, 4.5), 1, 5);
    ecs.world.spawn((Enemy::new(13.5, 2.5, EnemyKind::Orc),));
    ecs.world.spawn((Potion::new(2.8, 4.5, &mut rng),));

    let mut sim = Simulation::new(ecs);
    let mut audio = RecordingAudio::default();
    let events = sim.tick(&idle(), &mut audio);

    assert_eq!(events.potions_picked, 1);
    assert_eq!(sim.player().potions, 1);
    assert_eq!(sim.ecs.potion_count(), 0);
    assert!(audio.played.contains(&SoundEffect::PotionPickup));
}

#[test]
fn shooting_an_enemy_eventually_clears_the_level() {
    let mut ecs = ECSWorld::new(hall(), Player::new(2.5, 4.5), 1, 9);
    ecs.resources.player.angle = 0.0;
    let mut target = Enemy::new(6.5, 4.5, EnemyKind::Goblin);
    target.hp = 1;
    ecs.world.spawn((target,));
    let mut sim = Simulation::new(ecs);

    let aim = InputSnapshot {
        fire: Some((400.0, 300.0)),
        ..InputSnapshot::default()
    };
    let mut killed = false;
    for _ in 0..2000 {
        let events = sim.tick(&aim, &mut RecordingAudio::default());
        if events.enemies_killed > 0 {
            killed = true;
            break;
        }
        if sim.player().is_dead() {
            break;
        }
    }
    assert!(killed, "goblin survived");
    assert_eq!(sim.kills(), 1);
    assert!(sim.player().progression.xp > 0 || sim.player().level() > 1);

    for _ in 0..=DEATH_TICKS {
        sim.tick(&idle(), &mut RecordingAudio::default());
    }
    assert_eq!(sim.outcome(), LevelOutcome::Cleared);
}

#[test]
fn one_tick_runs_input_then_enemies_then_bullets_then_pickups() {
    let mut rng = Pcg32::seed_from_u64(4);
    let mut ecs = ECSWorld::new(hall(), Player::new(2.5, 4.5), 1, 21);
    ecs.resources.player.hp = 100;
    ecs.resources.player.potions = 1;

    let mut shooter = Enemy::new(5.5, 4.5, EnemyKind::Orc);
    shooter.shoot_timer = SHOOT_THRESHOLD;
    ecs.world.spawn((shooter,));
    // 已在飞、下一步就到玩家身上的敌方子弹
    ecs.world.spawn((Bullet::new(
        2.0,
        4.5,
        1.1,
        0.0,
        0.0,
        Owner::Enemy(EnemyKind::Orc, 1),
    ),));
    ecs.world.spawn((Potion::new(2.8, 4.5, &mut rng),));

    let mut sim = Simulation::new(ecs);
    let drink = InputSnapshot {
        use_potion: true,
        ..InputSnapshot::default()
    };
    let mut audio = RecordingAudio::default();
    let events = sim.tick(&drink, &mut audio);

    let healed = events.healed.expect("potion drunk");
    assert_eq!(events.enemy_shots, 1);
    assert_eq!(events.potions_picked, 1);

    let mut expected = vec![SoundEffect::PotionUse, SoundEffect::EnemyShoot];
    if events.damage_taken > 0 {
        expected.push(SoundEffect::Hit);
    }
    expected.push(SoundEffect::PotionPickup);
    assert_eq!(events.sounds, expected);
    assert_eq!(audio.played, expected);

    // 先喝后挨打：药水用掉的是旧的那瓶，新捡的留在包里
    assert_eq!(sim.player().hp, 100 + healed - events.damage_taken);
    assert_eq!(sim.player().potions, 1);
    assert_eq!(sim.ecs.potion_count(), 0);
    // 敌人新射出的子弹还在飞，旧的那颗已经结算
    assert_eq!(sim.ecs.bullet_count(), 1);
    assert_eq!(sim.outcome(), LevelOutcome::InProgress);
}
