use std::sync::Arc;

use compound_mcmc::errors::CompoundError;
use compound_mcmc::log_density::Gradient;
use compound_mcmc::steppers::{Hmc, Metropolis};
use compound_mcmc::{CompoundStep, Point, Runner, StepMethod};
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rv::dist::Gaussian;
use rv::misc::ks_test;
use rv::prelude::*;

struct Posterior {
    data: Vec<f64>,
    exact: Gaussian,
}

fn posterior(rng: &mut StdRng) -> Posterior {
    let n_data = 10;
    let data: Vec<f64> = Gaussian::new(1.0, 1.0).unwrap().sample(n_data, rng);

    // N(0, 1) prior, unit variance likelihood
    let data_sum: f64 = data.iter().sum();
    let mu = data_sum / (1.0 + n_data as f64);
    let sigma2 = 1.0 / (1.0 + n_data as f64);
    Posterior {
        data,
        exact: Gaussian::new(mu, sigma2.sqrt()).unwrap(),
    }
}

fn ln_posterior(data: &[f64], mean: f64) -> f64 {
    -0.5 * mean * mean - 0.5 * data.iter().map(|d| (d - mean).powi(2)).sum::<f64>()
}

fn sample_means<B>(builder: &B, rng: &mut StdRng) -> Vec<f64>
where
    B: Fn() -> Result<CompoundStep<StdRng>, CompoundError> + Sync,
{
    let traces = Runner::new(builder)
        .draws(1000)
        .warmup(1000)
        .thinning(10)
        .chains(2)
        .run(rng, Point::new().with_scalar("mean", 0.0))
        .unwrap();
    traces
        .iter()
        .flat_map(|t| t.draws.iter())
        .map(|p| p.scalar("mean").unwrap())
        .collect()
}

#[test]
fn mean_of_gaussians_metropolis() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = StdRng::seed_from_u64(0x726D636D63_u64);
    let Posterior { data, exact } = posterior(&mut rng);

    let log_density = Arc::new(move |p: &Point| ln_posterior(&data, p.scalar("mean").unwrap()));
    let builder = || -> Result<CompoundStep<StdRng>, CompoundError> {
        let methods: Vec<Box<dyn StepMethod<StdRng>>> =
            vec![Box::new(Metropolis::new(vec!["mean"], log_density.clone()).unwrap())];
        CompoundStep::new(methods, vec!["mean"])
    };

    let sample = sample_means(&builder, &mut rng);
    let (stat, p) = ks_test(&sample, |x| exact.cdf(&x));
    println!("stat = {}, p = {}", stat, p);
    assert!(p > 0.01);
}

#[test]
fn mean_of_gaussians_hmc() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = StdRng::seed_from_u64(0x726D636D63_u64);
    let Posterior { data, exact } = posterior(&mut rng);

    let log_density = Arc::new(move |p: &Point| {
        let mean = p.scalar("mean").unwrap();
        let slope = -mean + data.iter().map(|d| d - mean).sum::<f64>();
        let mut gradient = Gradient::new();
        gradient.insert("mean".to_owned(), DVector::from_element(1, slope));
        (ln_posterior(&data, mean), gradient)
    });
    let builder = || -> Result<CompoundStep<StdRng>, CompoundError> {
        let methods: Vec<Box<dyn StepMethod<StdRng>>> =
            vec![Box::new(Hmc::new(vec!["mean"], log_density.clone()).unwrap())];
        CompoundStep::new(methods, vec!["mean"])
    };

    let sample = sample_means(&builder, &mut rng);
    let (stat, p) = ks_test(&sample, |x| exact.cdf(&x));
    println!("stat = {}, p = {}", stat, p);
    assert!(p > 0.01);
}
