/// Heroic Strike example — a short fight told through heroic dice.
///
/// A mini encounter: a lucky d20 attack → a big damage pool → the enemy's
/// save pushed down.
///
/// Run with: cargo run --example heroic_strike

use heroic_dice::core::pipeline::{HeroicCounter, HeroicEngine};
use heroic_dice::schema::keep_rule::KeepRule;
use heroic_dice::schema::request::{Direction, HeroicRequest};
use heroic_dice::schema::roll::{Operator, Roll, RollTerm};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut engine = HeroicEngine::builder()
        .seed(2026)
        .config_path("demos/engine.ron")
        .build()
        .expect("Failed to build engine");

    let mut counter = HeroicCounter::new(6);

    // --- Attack: 1d20 + 5, one heroic die, explosions allowed ---
    let attack = Roll::new(vec![
        RollTerm::dice(20, &[17]),
        RollTerm::op(Operator::Add),
        RollTerm::number(5),
    ]);
    let request = HeroicRequest::new(attack, 1).explode(true);
    run("Attack", &mut engine, &request, &mut counter).await;

    // --- Damage: 2d8 + 2d8 + 3, keep both groups, two heroic dice ---
    let damage = Roll::new(vec![
        RollTerm::dice(8, &[6, 5]),
        RollTerm::op(Operator::Add),
        RollTerm::dice(8, &[1, 1]),
        RollTerm::op(Operator::Add),
        RollTerm::number(3),
    ]);
    let request = HeroicRequest::new(damage, 2)
        .keep(KeepRule::highest(2))
        .explode(true);
    run("Damage", &mut engine, &request, &mut counter).await;

    // --- Enemy save: 2d20 kl1 + 1, lowered ---
    let save = Roll::new(vec![
        RollTerm::dice(20, &[5]),
        RollTerm::op(Operator::Add),
        RollTerm::dice(20, &[13]),
        RollTerm::op(Operator::Add),
        RollTerm::number(1),
    ]);
    let request = HeroicRequest::new(save, 2)
        .keep(KeepRule::lowest(1))
        .direction(Direction::Decrease);
    run("Enemy save", &mut engine, &request, &mut counter).await;

    println!("Heroic dice left: {}", counter.available());
}

async fn run(
    label: &str,
    engine: &mut HeroicEngine,
    request: &HeroicRequest,
    counter: &mut HeroicCounter,
) {
    if request.quantity > counter.available() {
        println!("--- {}: not enough heroic dice ---\n", label);
        return;
    }
    let resolution = engine
        .resolve(request, counter)
        .await
        .expect("Failed to resolve heroic request");
    println!("--- {}: {} ---", label, request.roll);
    println!("{}\n", resolution.summary());
}
