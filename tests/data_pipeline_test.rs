use rand::rngs::StdRng;
use rand::SeedableRng;
use recsys_rs::config::from_json_file;
use recsys_rs::data::{
    subsampling, ColumnKey, Frame, MultinomialSampler, NegativeSampler, Records, Subsampler, SubsamplingFormula,
    UniformSampler,
};
use recsys_rs::layers::DnnConfig;
use recsys_rs::losses::{HingeLoss, Reduction};
use recsys_rs::models::DeepFfmConfig;
use recsys_rs::nn::Activation;
use recsys_rs::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;

/// Interaction log: `user` interacts with `item`, where item 0 is a popular outlier.
fn interactions() -> Frame<u32> {
    let rows = (0..2000u32)
        .map(|i| vec![i % 50, if i % 4 == 0 { i % 97 + 1 } else { 0 }])
        .collect();
    Frame::new(vec!["user".into(), "item".into()], rows).unwrap()
}

#[test]
fn test_subsampling_then_negative_sampling() {
    let frame = interactions();
    let mut rng = StdRng::seed_from_u64(17);

    let thinned = Subsampler::new(SubsamplingFormula::Paper, 0.01)
        .apply(&frame, "item", &mut rng)
        .unwrap();
    let popular_before = frame.rows().iter().filter(|r| r[1] == 0).count();
    let popular_after = thinned.rows().iter().filter(|r| r[1] == 0).count();
    assert_eq!(popular_before, 1500);
    assert!(popular_after < 300, "kept {popular_after}");

    // popularity counts from the thinned log drive the negative sampler
    let mut counts = vec![0usize; 98];
    for item in thinned.column(&ColumnKey::from("item")).unwrap() {
        counts[*item as usize] += 1;
    }
    let sampler = MultinomialSampler::from_counts(&counts, 0.75).unwrap();
    let negatives = sampler.sample(thinned.num_rows(), 4, &mut rng);
    assert_eq!(negatives.shape(), &[thinned.num_rows(), 4]);
    assert!(negatives
        .data()
        .iter()
        .all(|&id| id < sampler.num_items() && counts[id] > 0));
}

#[test]
fn test_subsampling_by_index_matches_by_name() {
    let frame = interactions();
    let by_name = subsampling(&frame, "item", SubsamplingFormula::Code, 0.05, &mut StdRng::seed_from_u64(1)).unwrap();
    let by_index = subsampling(&frame, 1usize, SubsamplingFormula::Code, 0.05, &mut StdRng::seed_from_u64(1)).unwrap();
    assert_eq!(by_name, by_index);

    let raw: Vec<Vec<u32>> = frame.rows().to_vec();
    assert!(matches!(
        subsampling(&raw, "item", SubsamplingFormula::Code, 0.05, &mut StdRng::seed_from_u64(1)),
        Err(Error::UnsupportedKey { .. })
    ));
    assert!(matches!(
        "word2vec".parse::<SubsamplingFormula>(),
        Err(Error::UnsupportedFormula(_))
    ));
}

#[test]
fn test_uniform_sampler_covers_vocabulary() {
    let sampler = UniformSampler::new(10).unwrap();
    let ids = sampler.sample(200, 5, &mut StdRng::seed_from_u64(0));
    let mut seen: HashMap<usize, usize> = HashMap::new();
    for &id in ids.data() {
        *seen.entry(id).or_insert(0) += 1;
    }
    assert_eq!(seen.len(), 10);
}

#[derive(Debug, Deserialize)]
struct Experiment {
    model: DeepFfmConfig,
    loss: HingeLoss,
    subsampling: Subsampler,
    tower: DnnConfig,
}

#[test]
fn test_experiment_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "model": {{"embed_size": 8, "num_fields": 4, "deep_output_size": 1, "deep_layer_sizes": [32, 16], "deep_dropout_p": [0.1, 0.1]}},
            "loss": {{"margin": 0.5, "reduction": "sum"}},
            "subsampling": {{"formula": "code", "threshold": 0.001}},
            "tower": {{"inputs_size": 8, "output_size": 4, "layer_sizes": [16], "activation": "sigmoid"}}
        }}"#
    )
    .unwrap();

    let experiment: Experiment = from_json_file(file.path()).unwrap();
    experiment.model.validate().unwrap();
    experiment.tower.validate().unwrap();
    assert_eq!(experiment.loss.margin, 0.5);
    assert_eq!(experiment.loss.reduction, Reduction::Sum);
    assert_eq!(experiment.subsampling, Subsampler::new(SubsamplingFormula::Code, 0.001));
    assert_eq!(experiment.tower.activation, Activation::Sigmoid);
}
