// Candidate module tests
