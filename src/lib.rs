pub mod hmm;
