use hmm_decode::hmm::alphabet::Alphabet;
use hmm_decode::hmm::hmm_instance::HMMInstance;
use hmm_decode::hmm::hmm_matrices::{EmissionMatrix, StartMatrix, TransitionMatrix};
use hmm_decode::hmm::state::State;

fn main() {
    env_logger::init();

    // Reference two-state model over the O1/O2/O3 alphabet
    let states = State::from_names(&["H1", "H2"]).unwrap();
    let alphabet = Alphabet::from_labels(&["O1", "O2", "O3"]).unwrap();

    let start_matrix = StartMatrix::new(vec![0.6, 0.4]);

    let transition_matrix_raw: Vec<Vec<f64>> = vec![
        vec![0.7, 0.3],
        vec![0.4, 0.6],
    ];
    let transition_matrix = TransitionMatrix::new(transition_matrix_raw);

    let emission_matrix_raw: Vec<Vec<f64>> = vec![
        vec![0.1, 0.4, 0.5],
        vec![0.6, 0.3, 0.1],
    ];
    let emission_matrix = EmissionMatrix::new(emission_matrix_raw);

    let observations = ["O1", "O1", "O2", "O3"];

    let mut hmm_instance = HMMInstance::new(
        &states,
        &alphabet,
        &start_matrix,
        &transition_matrix,
        &emission_matrix,
    );

    if let Err(error) = hmm_instance.run_viterbi_on_labels(&observations) {
        println!("Decoding failed: {:?}", error);
        return;
    }

    let path = hmm_instance.get_decoded_labels().unwrap();

    println!("Observations: {:?}", observations);
    println!("Most likely sequence of hidden states: {:?}", path);
    println!(
        "Path probability: {}",
        hmm_instance.get_path_probability().unwrap()
    );

    if hmm_instance.is_degenerate() {
        println!(
            "Warning: probability collapsed to zero at time steps {:?}",
            hmm_instance.degenerate_steps()
        );
    }
}
